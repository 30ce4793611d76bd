//! One full lookup cycle: cache first, then fetch + parse + insert.

use std::time::Instant;

use define_core::{normalize_word, LexicalRecord};

use crate::bounded::BoundedWordCache;
use crate::cache_trait::DictionaryCache;
use crate::error::ResolveError;
use crate::fetcher::Fetcher;
use crate::store::WordStore;

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Skip the cache and always fetch.
    pub bypass_cache: bool,
    /// Insert a freshly fetched record into the cache.
    pub store_result: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            bypass_cache: false,
            store_result: true,
        }
    }
}

/// Where a resolved record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Network,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: LexicalRecord,
    pub source: Source,
}

/// Resolve `word` to a record.
///
/// The fetcher is called only on a miss or when the cache is bypassed. A
/// fetch or parse failure leaves the cache untouched.
pub fn resolve<S, F>(
    cache: &mut BoundedWordCache<S>,
    fetcher: &F,
    word: &str,
    options: ResolveOptions,
) -> Result<Resolution, ResolveError>
where
    S: WordStore,
    F: Fetcher + ?Sized,
{
    let key = normalize_word(word);
    if key.is_empty() {
        return Err(ResolveError::EmptyWord);
    }

    if !options.bypass_cache {
        if let Some(record) = cache.lookup(&key) {
            tracing::debug!(word = %key, cache = cache.name(), "cache hit");
            return Ok(Resolution {
                record,
                source: Source::Cache,
            });
        }
        tracing::debug!(word = %key, cache = cache.name(), "cache miss");
    }

    let start = Instant::now();
    let raw = fetcher.fetch(&key)?;
    let record = define_parser::parse(&raw).map_err(|failure| {
        tracing::warn!(word = %key, reason = %failure.reason(), "could not parse result page");
        failure
    })?;
    tracing::debug!(
        word = %key,
        meanings = record.meanings().len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "resolved from network"
    );

    let record = if options.store_result {
        cache.insert(&key, record.clone())?;
        cache.lookup(&key).unwrap_or(record)
    } else {
        record
    };

    Ok(Resolution {
        record,
        source: Source::Network,
    })
}
