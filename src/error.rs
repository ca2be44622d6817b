//! Error types for the fetch, persistence and configuration layers.
//!
//! Extraction never fails (bad markup is skipped per candidate) and author
//! resolution degrades to the `"Unknown"` sentinel, so neither has an error
//! type of its own.

use thiserror::Error;

/// Failures surfaced by an [`HttpClient`](crate::fetcher::HttpClient).
///
/// Non-2xx responses are not errors at this level; they come back as an
/// [`HttpResponse`](crate::fetcher::HttpResponse) carrying the status so the
/// caller can tell a rate limit from a missing page.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} timed out after {secs} seconds")]
    Timeout { url: String, secs: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } => true,
            FetchError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
        }
    }
}

/// Failures of the SQLite-backed store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("author name must not be empty")]
    EmptyAuthorName,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

/// Failures while loading the YAML configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
