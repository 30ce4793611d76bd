use std::path::PathBuf;

use define_parser::ParseFailure;

/// Persistence failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache store I/O failed at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache store {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("cannot serialize cache store: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A cache operation was rejected or could not be persisted.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The external fetch failed before any parsing happened.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("dictionary service answered with HTTP {0}")]
    Status(u16),
    #[error("dictionary service unreachable: {0}")]
    Transport(String),
}

/// A full lookup cycle failed.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("cannot look up an empty word")]
    EmptyWord,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseFailure),
    #[error(transparent)]
    Cache(#[from] CacheError),
}
