//! Persistent backing store for the word cache.
//!
//! The store only ever reads or writes the whole state. `JsonFileStore`
//! writes to a temporary file next to the target and renames it into place,
//! so a reader sees either the old or the new content.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use define_core::{normalize_word, LexicalRecord};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

const FORMAT_VERSION: u32 = 1;

// ─── State ───────────────────────────────────────────────────────

/// Serialized form of the cache: insertion order plus records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    /// Keys, oldest first.
    pub order: Vec<String>,
    pub records: HashMap<String, LexicalRecord>,
}

impl StoreState {
    /// Check that `order` holds exactly the record keys, once each, and
    /// that every key is in normalized form.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.order.len());
        for word in &self.order {
            if normalize_word(word) != *word {
                return Err(format!("word '{}' is not normalized", word));
            }
            if !seen.insert(word.as_str()) {
                return Err(format!("word '{}' appears twice in the insertion order", word));
            }
            if !self.records.contains_key(word) {
                return Err(format!("word '{}' is ordered but has no record", word));
            }
        }
        if let Some(orphan) = self.records.keys().find(|k| !seen.contains(k.as_str())) {
            return Err(format!("record '{}' is missing from the insertion order", orphan));
        }
        Ok(())
    }
}

// ─── Store trait ─────────────────────────────────────────────────

/// Whole-state persistence. `load(save(s)) == s` for every valid state.
pub trait WordStore {
    /// Load the persisted state; an absent store is an empty state.
    fn load(&self) -> Result<StoreState, StoreError>;

    /// Replace the persisted state.
    fn save(&self, state: &StoreState) -> Result<(), StoreError>;

    /// Human-readable location (for logging and `--cache-path`).
    fn location(&self) -> String;
}

impl<S: WordStore + ?Sized> WordStore for &S {
    fn load(&self) -> Result<StoreState, StoreError> {
        (**self).load()
    }

    fn save(&self, state: &StoreState) -> Result<(), StoreError> {
        (**self).save(state)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

// ─── JSON file store ─────────────────────────────────────────────

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    #[serde(flatten)]
    state: &'a StoreState,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    #[serde(flatten)]
    state: StoreState,
}

/// Single JSON file holding the whole cache.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub const FILE_NAME: &'static str = "words.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/words.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

impl WordStore for JsonFileStore {
    fn load(&self) -> Result<StoreState, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = ?self.path, "no cache store yet, starting empty");
                return Ok(StoreState::default());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let envelope: Envelope = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| self.corrupt(e.to_string()))?;
        if envelope.version != FORMAT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported format version {} (expected {})",
                envelope.version, FORMAT_VERSION
            )));
        }
        envelope.state.validate().map_err(|reason| self.corrupt(reason))?;

        tracing::debug!(path = ?self.path, words = envelope.state.order.len(), "loaded cache store");
        Ok(envelope.state)
    }

    fn save(&self, state: &StoreState) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let temp_path = temp.path().to_path_buf();
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(
                &mut writer,
                &EnvelopeRef {
                    version: FORMAT_VERSION,
                    state,
                },
            )?;
            writer.flush().map_err(|e| StoreError::io(&temp_path, e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(&temp_path, e))?;
        temp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        tracing::debug!(path = ?self.path, words = state.order.len(), "saved cache store");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ─── In-memory store ─────────────────────────────────────────────

/// Keeps the saved state in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<StoreState>,
    saves: RefCell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: RefCell::new(state),
            saves: RefCell::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn saves(&self) -> usize {
        *self.saves.borrow()
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }
}

impl WordStore for MemoryStore {
    fn load(&self) -> Result<StoreState, StoreError> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &StoreState) -> Result<(), StoreError> {
        *self.state.borrow_mut() = state.clone();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use define_core::{Meaning, RecordBuilder};

    fn record(word: &str, seq: u64) -> LexicalRecord {
        RecordBuilder::new(word)
            .phonetic(format!("/{}/", word))
            .meaning(Meaning::new(Some("n.".into()), format!("meaning of {}", word)))
            .build()
            .unwrap()
            .with_fetched_at(seq)
    }

    fn state(words: &[&str]) -> StoreState {
        StoreState {
            order: words.iter().map(|w| w.to_string()).collect(),
            records: words
                .iter()
                .enumerate()
                .map(|(i, w)| (w.to_string(), record(w, i as u64)))
                .collect(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), StoreState::default());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(&dir.path().join("nested/cache"));
        let original = state(&["cat", "dog", "emu"]);
        store.save(&original).unwrap();
        assert_eq!(store.load().unwrap(), original);

        let replaced = state(&["fox"]);
        store.save(&replaced).unwrap();
        assert_eq!(store.load().unwrap(), replaced);
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        store.save(&state(&["cat"])).unwrap();
        store.save(&state(&["cat", "dog"])).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![JsonFileStore::FILE_NAME.to_string()]);
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        fs::write(store.path(), b"{ not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn inconsistent_order_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        let mut bad = state(&["cat", "dog"]);
        bad.order.push("cat".into());
        store.save(&bad).unwrap();
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("appears twice"), "{}", err);
    }

    #[test]
    fn wrong_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        fs::write(store.path(), br#"{"version":99,"order":[],"records":{}}"#).unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn validate_reports_orphans() {
        let mut s = state(&["cat", "dog"]);
        assert!(s.validate().is_ok());
        s.order.retain(|w| w != "dog");
        assert!(s.validate().unwrap_err().contains("dog"));
        s.order.push("ghost".into());
        assert!(s.validate().unwrap_err().contains("ghost"));
    }

    #[test]
    fn non_normalized_key_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        let mut bad = state(&["cat"]);
        let record = bad.records.remove("cat").unwrap();
        bad.order = vec!["Cat".into()];
        bad.records.insert("Cat".into(), record);
        assert!(bad.validate().unwrap_err().contains("not normalized"));

        store.save(&bad).unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn save_under_a_regular_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let store = JsonFileStore::in_dir(&blocker);
        assert!(matches!(store.save(&state(&["cat"])), Err(StoreError::Io { .. })));
    }

    #[test]
    fn memory_store_round_trip_and_save_count() {
        let store = MemoryStore::new();
        let s = state(&["cat"]);
        store.save(&s).unwrap();
        assert_eq!(store.load().unwrap(), s);
        assert_eq!(store.saves(), 1);
    }
}
