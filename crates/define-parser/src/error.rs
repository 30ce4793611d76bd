use define_core::RecordError;

/// Characters of raw input kept on a failure for diagnostics.
pub const SNIPPET_CHARS: usize = 200;

/// Why a response could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("empty response")]
    EmptyInput,
    #[error("malformed markup at byte {position}: {message}")]
    MalformedMarkup { position: u64, message: String },
    #[error("result container `#results-contents` not found")]
    MissingContainer,
    #[error("headword not found in response")]
    WordNotFound,
    #[error("the dictionary has no entry for this query")]
    NoMatch {
        /// Spellings the service offered instead.
        suggestions: Vec<String>,
    },
    #[error(transparent)]
    InvalidRecord(#[from] RecordError),
}

/// Structured parse failure carrying the start of the offending input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct ParseFailure {
    pub kind: FailureKind,
    pub raw_snippet: String,
}

impl ParseFailure {
    pub fn new(kind: FailureKind, raw: &str) -> Self {
        Self {
            kind,
            raw_snippet: raw.chars().take(SNIPPET_CHARS).collect(),
        }
    }

    /// Human-readable diagnostic.
    pub fn reason(&self) -> String {
        self.kind.to_string()
    }

    /// Suggestions offered by the service, empty unless this is a no-match.
    pub fn suggestions(&self) -> &[String] {
        match &self.kind {
            FailureKind::NoMatch { suggestions } => suggestions,
            _ => &[],
        }
    }
}
