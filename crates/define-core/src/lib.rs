//! Lexical record model shared by the parser, the cache and the renderer.
//!
//! A `LexicalRecord` is immutable once built: fields are private, reads go
//! through accessors, and construction (including deserialization) goes
//! through validation.

use serde::{Deserialize, Serialize};

// ─── Errors ──────────────────────────────────────────────────────

/// A record failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record word is empty")]
    EmptyWord,
    #[error("record for '{0}' has no meanings and is not marked as having no definitions")]
    MissingDefinitions(String),
    #[error("record for '{word}' is marked as having no definitions but carries {count} meaning(s)")]
    ConflictingDefinitions { word: String, count: usize },
}

// ─── Normalization ───────────────────────────────────────────────

/// Canonical key form of a word: surrounding whitespace removed, lowercase.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

// ─── Record parts ────────────────────────────────────────────────

/// A usage example or bilingual sentence pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub sentence: String,
    pub translation: String,
}

impl Example {
    pub fn new(sentence: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            sentence: sentence.into(),
            translation: translation.into(),
        }
    }
}

/// A fixed phrase built around the word, with its translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordGroup {
    pub phrase: String,
    pub translation: String,
}

impl WordGroup {
    pub fn new(phrase: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            translation: translation.into(),
        }
    }
}

/// One sense of the word.
///
/// `definition` may contain `<b>…</b>` around highlighted keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meaning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    pub definition: String,
    /// Usage examples attached to this sense (Collins entries only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
}

impl Meaning {
    pub fn new(part_of_speech: Option<String>, definition: impl Into<String>) -> Self {
        Self {
            part_of_speech,
            definition: definition.into(),
            examples: Vec::new(),
        }
    }

    pub fn with_examples(mut self, examples: Vec<Example>) -> Self {
        self.examples = examples;
        self
    }
}

// ─── LexicalRecord ───────────────────────────────────────────────

/// The validated dictionary entry for one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordRepr", into = "RecordRepr")]
pub struct LexicalRecord {
    word: String,
    phonetics: Vec<String>,
    meanings: Vec<Meaning>,
    word_groups: Vec<WordGroup>,
    examples: Vec<Example>,
    no_definitions: bool,
    fetched_at: u64,
}

impl LexicalRecord {
    /// Normalized headword; never empty.
    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn phonetics(&self) -> &[String] {
        &self.phonetics
    }

    /// Meanings in source order.
    pub fn meanings(&self) -> &[Meaning] {
        &self.meanings
    }

    pub fn word_groups(&self) -> &[WordGroup] {
        &self.word_groups
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    /// True when the source page carried no usable definition.
    pub fn no_definitions(&self) -> bool {
        self.no_definitions
    }

    /// Insertion sequence number assigned by the cache (0 before insertion).
    pub fn fetched_at(&self) -> u64 {
        self.fetched_at
    }

    /// Copy of this record carrying the given insertion marker.
    pub fn with_fetched_at(&self, sequence: u64) -> Self {
        Self {
            fetched_at: sequence,
            ..self.clone()
        }
    }

    fn validate(self) -> Result<Self, RecordError> {
        if self.word.is_empty() {
            return Err(RecordError::EmptyWord);
        }
        match (self.meanings.is_empty(), self.no_definitions) {
            (true, false) => Err(RecordError::MissingDefinitions(self.word)),
            (false, true) => Err(RecordError::ConflictingDefinitions {
                count: self.meanings.len(),
                word: self.word,
            }),
            _ => Ok(self),
        }
    }
}

/// Serialized shape of a record; converted back through validation.
#[derive(Serialize, Deserialize)]
struct RecordRepr {
    word: String,
    #[serde(default)]
    phonetics: Vec<String>,
    #[serde(default)]
    meanings: Vec<Meaning>,
    #[serde(default)]
    word_groups: Vec<WordGroup>,
    #[serde(default)]
    examples: Vec<Example>,
    #[serde(default)]
    no_definitions: bool,
    #[serde(default)]
    fetched_at: u64,
}

impl TryFrom<RecordRepr> for LexicalRecord {
    type Error = RecordError;

    fn try_from(repr: RecordRepr) -> Result<Self, Self::Error> {
        LexicalRecord {
            word: repr.word,
            phonetics: repr.phonetics,
            meanings: repr.meanings,
            word_groups: repr.word_groups,
            examples: repr.examples,
            no_definitions: repr.no_definitions,
            fetched_at: repr.fetched_at,
        }
        .validate()
    }
}

impl From<LexicalRecord> for RecordRepr {
    fn from(record: LexicalRecord) -> Self {
        Self {
            word: record.word,
            phonetics: record.phonetics,
            meanings: record.meanings,
            word_groups: record.word_groups,
            examples: record.examples,
            no_definitions: record.no_definitions,
            fetched_at: record.fetched_at,
        }
    }
}

// ─── Builder ─────────────────────────────────────────────────────

/// Assembles a `LexicalRecord`; `build` enforces the record invariants.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    word: String,
    phonetics: Vec<String>,
    meanings: Vec<Meaning>,
    word_groups: Vec<WordGroup>,
    examples: Vec<Example>,
    no_definitions: bool,
}

impl RecordBuilder {
    /// Start a record; the word is normalized.
    pub fn new(word: &str) -> Self {
        Self {
            word: normalize_word(word),
            ..Default::default()
        }
    }

    pub fn phonetic(mut self, phonetic: impl Into<String>) -> Self {
        self.phonetics.push(phonetic.into());
        self
    }

    pub fn phonetics(mut self, phonetics: impl IntoIterator<Item = String>) -> Self {
        self.phonetics.extend(phonetics);
        self
    }

    pub fn meaning(mut self, meaning: Meaning) -> Self {
        self.meanings.push(meaning);
        self
    }

    pub fn meanings(mut self, meanings: impl IntoIterator<Item = Meaning>) -> Self {
        self.meanings.extend(meanings);
        self
    }

    pub fn word_group(mut self, group: WordGroup) -> Self {
        self.word_groups.push(group);
        self
    }

    pub fn word_groups(mut self, groups: impl IntoIterator<Item = WordGroup>) -> Self {
        self.word_groups.extend(groups);
        self
    }

    pub fn example(mut self, example: Example) -> Self {
        self.examples.push(example);
        self
    }

    pub fn examples(mut self, examples: impl IntoIterator<Item = Example>) -> Self {
        self.examples.extend(examples);
        self
    }

    /// Mark the record as a valid entry without any definition.
    pub fn no_definitions(mut self) -> Self {
        self.no_definitions = true;
        self
    }

    pub fn build(self) -> Result<LexicalRecord, RecordError> {
        LexicalRecord {
            word: self.word,
            phonetics: self.phonetics,
            meanings: self.meanings,
            word_groups: self.word_groups,
            examples: self.examples,
            no_definitions: self.no_definitions,
            fetched_at: 0,
        }
        .validate()
    }
}
