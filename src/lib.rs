//! Rubric-Harvest: a resumable catalog harvester
//!
//! This crate crawls a paginated, access-restricted online catalog and extracts
//! publication records for a set of entities (journals), each split into
//! categories with known item counts. Progress is checkpointed after every page
//! so an interrupted multi-day crawl never loses or duplicates work.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod session;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Rubric-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Page operation failed: {0}")]
    Page(#[from] OpFailure),

    #[error("{operation} failed after {attempts} attempts, last failure: {last}")]
    AttemptsExhausted {
        operation: String,
        attempts: u32,
        last: OpFailure,
    },

    #[error("Proxy pool exhausted after identity #{index}")]
    ProxyPoolExhausted { index: u32 },

    #[error("Unrecoverable failure in {operation}: {message}")]
    Unrecoverable { operation: String, message: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// Returns true if this error only aborts the entity being crawled
    ///
    /// Everything else (pool exhaustion, storage, IO) aborts the whole pass.
    pub fn is_entity_scoped(&self) -> bool {
        matches!(
            self,
            Self::AttemptsExhausted { .. } | Self::Unrecoverable { .. } | Self::Page(_)
        )
    }
}

/// Outcome of a failed page-level operation
///
/// Every session operation reports failures through this enumeration; the
/// failure classifier maps it onto a retry decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpFailure {
    #[error("anonymous IP blocked")]
    Blocked,

    #[error("anti-bot challenge detected")]
    Challenge,

    #[error("server error page")]
    ServerError,

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("category selection dropped")]
    SelectionLost,

    #[error("unexpected page state: {0}")]
    Unexpected(String),

    #[error("unrecoverable: {0}")]
    Unrecoverable(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Rubric-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{classify, Driver, FailureClass};
pub use state::{CategoryProgress, EntityState};
