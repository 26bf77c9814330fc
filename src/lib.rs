//! Activity-Collector: an incremental, quota-aware activity log poller
//!
//! This crate repeatedly queries a paginated activity API for bounded time windows,
//! frames each event into a log record, and computes the next window and poll delay,
//! accelerating when collection falls behind and backing off when the daily quota is spent.

pub mod collector;
pub mod config;
pub mod credentials;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for collector operations
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Daily quota exceeded for target {target}")]
    QuotaExceeded { target: String },

    #[error("Upstream error for target {target} (HTTP {status}): {message}")]
    Upstream {
        target: String,
        status: u16,
        message: String,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode upstream page for {target}: {message}")]
    Decode { target: String, message: String },

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    #[error("Invalid timestamp in config: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid timezone in config: {0}")]
    InvalidTimezone(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;

// Re-export commonly used types
pub use collector::{fetch_all, initialize, poll_once, transition, Invocation, Transition};
pub use config::{Config, SchedulerSettings};
pub use output::LogRecord;
pub use state::{CollectionState, FetchOutcome};
