//! Bounded, persistent word cache plus the lookup cycle around it.
//!
//! - `BoundedWordCache`: insertion-ordered cache with explicit trimming.
//! - `WordStore`: whole-state persistence (`JsonFileStore`, `MemoryStore`).
//! - `Fetcher`: network source of raw pages (`YoudaoFetcher`).
//! - `resolve`: cache first, then fetch, parse and insert.

pub mod bounded;
pub mod cache_trait;
pub mod error;
pub mod fetcher;
pub mod resolver;
pub mod store;

pub use bounded::{BoundedWordCache, OpenMode, TrimTarget};
pub use cache_trait::DictionaryCache;
pub use error::{CacheError, FetchError, ResolveError, StoreError};
pub use fetcher::{FetchConfig, Fetcher, YoudaoFetcher};
pub use resolver::{resolve, Resolution, ResolveOptions, Source};
pub use store::{JsonFileStore, MemoryStore, StoreState, WordStore};
