//! Read-side cache seam.
//!
//! Anything that can answer "do we already know this word?" implements
//! `DictionaryCache`. The resolve cycle reads through this view; mutation
//! lives on the concrete `BoundedWordCache`.

use define_core::LexicalRecord;

/// Read access to cached lexical records.
///
/// Lookups normalize the word (trim + lowercase) before comparing keys and
/// never change cache state.
pub trait DictionaryCache {
    /// Look up a word. Returns `None` if the word is not in the cache.
    fn lookup(&self, word: &str) -> Option<LexicalRecord>;

    /// Check if a word exists without cloning the record.
    fn contains(&self, word: &str) -> bool;

    /// Human-readable name of this cache backend (for logging).
    fn name(&self) -> &str;

    /// Total number of entries in the cache.
    fn len(&self) -> usize;

    /// Whether the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
