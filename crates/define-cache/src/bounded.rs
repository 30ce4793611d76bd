//! BoundedWordCache: persistent word → record cache with FIFO trimming.
//!
//! Order is insertion order, not access order: a lookup hit never moves an
//! entry and re-inserting a known word replaces its record in place. Entries
//! leave only through `trim`. The in-memory state is the source of truth
//! until `flush` writes the full state back to the store.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use define_core::{normalize_word, LexicalRecord};

use crate::cache_trait::DictionaryCache;
use crate::error::{CacheError, StoreError};
use crate::store::{StoreState, WordStore};

// ─── Trim target ─────────────────────────────────────────────────

/// Validated entry count to trim down to. `0` empties the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimTarget(usize);

impl TrimTarget {
    pub const ALL: TrimTarget = TrimTarget(0);

    pub fn new(count: usize) -> Self {
        Self(count)
    }

    pub fn count(self) -> usize {
        self.0
    }
}

impl fmt::Display for TrimTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for TrimTarget {
    type Error = CacheError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value).map(TrimTarget).map_err(|_| CacheError::InvalidArgument {
            name: "target",
            reason: format!("trim target must be zero or positive, got {}", value),
        })
    }
}

impl FromStr for TrimTarget {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return TrimTarget::try_from(n);
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                TrimTarget::try_from(f as i64)
            }
            Ok(_) => Err(CacheError::InvalidArgument {
                name: "target",
                reason: format!("trim target must be an integer, got '{}'", s),
            }),
            Err(_) => Err(CacheError::InvalidArgument {
                name: "target",
                reason: format!("trim target is not a number: '{}'", s),
            }),
        }
    }
}

/// What opening does with a store whose content cannot be read back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Report `StoreError::Corrupt`.
    #[default]
    Strict,
    /// Start empty; the next flush replaces the corrupt content.
    ResetCorrupt,
}

// ─── BoundedWordCache ────────────────────────────────────────────

pub struct BoundedWordCache<S: WordStore> {
    store: S,
    /// Keys, oldest first; same key set as `records`.
    order: VecDeque<String>,
    records: HashMap<String, LexicalRecord>,
    /// Marker handed to the next newly inserted record.
    next_sequence: u64,
    dirty: bool,
}

impl<S: WordStore> BoundedWordCache<S> {
    /// Load the persisted state (empty if none exists).
    pub fn open(store: S) -> Result<Self, CacheError> {
        Self::open_with(store, OpenMode::Strict)
    }

    /// Load the persisted state, handling corrupt content per `mode`.
    pub fn open_with(store: S, mode: OpenMode) -> Result<Self, CacheError> {
        let loaded = store.load().and_then(|state| {
            state.validate().map_err(|reason| StoreError::Corrupt {
                path: store.location().into(),
                reason,
            })?;
            Ok(state)
        });
        match loaded {
            Ok(state) => Ok(Self::from_valid(store, state)),
            Err(StoreError::Corrupt { path, reason }) if mode == OpenMode::ResetCorrupt => {
                tracing::warn!(?path, %reason, "ignoring corrupt cache store");
                Ok(Self::empty(store))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Start from an empty cache regardless of what the store holds.
    /// The next `flush` replaces the stored content.
    pub fn empty(store: S) -> Self {
        Self {
            store,
            order: VecDeque::new(),
            records: HashMap::new(),
            next_sequence: 1,
            dirty: true,
        }
    }

    pub fn from_state(store: S, state: StoreState) -> Result<Self, CacheError> {
        state.validate().map_err(|reason| {
            CacheError::Store(StoreError::Corrupt {
                path: store.location().into(),
                reason,
            })
        })?;
        Ok(Self::from_valid(store, state))
    }

    fn from_valid(store: S, state: StoreState) -> Self {
        let next_sequence = state
            .records
            .values()
            .map(LexicalRecord::fetched_at)
            .max()
            .map_or(1, |max| max + 1);
        Self {
            store,
            order: state.order.into(),
            records: state.records,
            next_sequence,
            dirty: false,
        }
    }

    /// Scoped session: open, apply `f`, then write the full state back once
    /// if anything changed. When `f` fails nothing is written.
    pub fn transact<T, E, F>(store: S, mode: OpenMode, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<CacheError>,
    {
        let mut cache = Self::open_with(store, mode)?;
        let out = f(&mut cache)?;
        cache.flush()?;
        Ok(out)
    }

    /// Borrowing lookup; does not touch insertion order.
    pub fn get(&self, word: &str) -> Option<&LexicalRecord> {
        self.records.get(&normalize_word(word))
    }

    /// Add or replace the record for `word`.
    ///
    /// A new word goes to the back of the insertion order. A known word keeps
    /// its position and its original `fetched_at`.
    pub fn insert(&mut self, word: &str, record: LexicalRecord) -> Result<(), CacheError> {
        let key = normalize_word(word);
        if key.is_empty() {
            return Err(CacheError::InvalidArgument {
                name: "word",
                reason: "cannot cache an empty word".to_string(),
            });
        }

        match self.records.get(&key).map(LexicalRecord::fetched_at) {
            Some(sequence) => {
                tracing::debug!(word = %key, "replacing cached record in place");
                self.records.insert(key, record.with_fetched_at(sequence));
            }
            None => {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                tracing::debug!(word = %key, sequence, "caching new record");
                self.order.push_back(key.clone());
                self.records.insert(key, record.with_fetched_at(sequence));
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Evict oldest entries until at most `target` remain. Returns the
    /// evicted words, oldest first.
    pub fn trim(&mut self, target: TrimTarget) -> Vec<String> {
        let excess = self.order.len().saturating_sub(target.count());
        let evicted: Vec<String> = self.order.drain(..excess).collect();
        for word in &evicted {
            self.records.remove(word);
        }
        if !evicted.is_empty() {
            self.dirty = true;
            tracing::info!(
                %target,
                evicted = evicted.len(),
                remaining = self.order.len(),
                "trimmed word cache"
            );
        }
        evicted
    }

    /// `trim` with an unchecked count; negative counts are rejected before
    /// anything changes.
    pub fn trim_to(&mut self, target: i64) -> Result<Vec<String>, CacheError> {
        let target = TrimTarget::try_from(target)?;
        Ok(self.trim(target))
    }

    /// Cached words, oldest first.
    pub fn list_words(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshot in the store's serialized shape.
    pub fn state(&self) -> StoreState {
        StoreState {
            order: self.list_words(),
            records: self.records.clone(),
        }
    }

    /// Write the full state back if it changed since the last load/flush.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        if !self.dirty {
            return Ok(());
        }
        self.store.save(&self.state())?;
        self.dirty = false;
        Ok(())
    }
}

impl<S: WordStore> DictionaryCache for BoundedWordCache<S> {
    fn lookup(&self, word: &str) -> Option<LexicalRecord> {
        self.get(word).cloned()
    }

    fn contains(&self, word: &str) -> bool {
        self.records.contains_key(&normalize_word(word))
    }

    fn name(&self) -> &str {
        "BoundedWordCache"
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}
