//! Fetcher: the network side of a lookup.
//!
//! `YoudaoFetcher` issues one blocking GET against the Youdao search page
//! through a `ureq` agent with a global timeout. It returns raw bytes; all
//! interpretation happens in the parser.

use std::time::{Duration, Instant};

use ureq::Agent;

use crate::error::FetchError;

/// Source of raw result pages.
pub trait Fetcher {
    /// Fetch the raw page for an already-normalized word.
    fn fetch(&self, word: &str) -> Result<Vec<u8>, FetchError>;
}

// ─── Configuration ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Search endpoint (e.g., "https://dict.youdao.com/search").
    pub base_url: String,
    /// Upper bound for the whole request, connect to last byte.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dict.youdao.com/search".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("define/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ─── YoudaoFetcher ───────────────────────────────────────────────

pub struct YoudaoFetcher {
    agent: Agent,
    config: FetchConfig,
}

impl YoudaoFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Self {
            agent,
            config: FetchConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

impl Fetcher for YoudaoFetcher {
    fn fetch(&self, word: &str) -> Result<Vec<u8>, FetchError> {
        let start = Instant::now();
        let mut response = self
            .agent
            .get(self.config.base_url.as_str())
            .query("q", word)
            .query("le", "eng")
            .query("keyfrom", "dict2.index")
            .header("User-Agent", self.config.user_agent.as_str())
            .call()
            .map_err(fetch_error)?;

        let body = response.body_mut().read_to_vec().map_err(fetch_error)?;
        tracing::info!(
            word,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched result page"
        );
        Ok(body)
    }
}

fn fetch_error(error: ureq::Error) -> FetchError {
    match error {
        ureq::Error::StatusCode(code) => FetchError::Status(code),
        other => FetchError::Transport(other.to_string()),
    }
}
