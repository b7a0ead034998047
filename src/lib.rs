//! Catalog-Scout: an adaptive marketplace catalog scanner
//!
//! This crate discovers the newest item identifier on a marketplace, then walks
//! the identifier space forward one item at a time, tuning its step size and
//! concurrency to keep pace with newly listed items without tripping rate limits.

pub mod catalog;
pub mod config;
pub mod output;
pub mod scanner;
pub mod session;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Malformed payload from {url}: {message}")]
    Payload { url: String, message: String },

    #[error("Catalog listing from {url} contained no usable item IDs")]
    EmptyCatalog { url: String },

    #[error("Invalid proxy URL '{url}': {source}")]
    Proxy { url: String, source: reqwest::Error },

    #[error("Session error: {0}")]
    Session(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
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

/// Result type alias for Catalog-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::CatalogItem;
pub use config::Config;
pub use scanner::{FetchOutcome, MarketplaceApi, Scanner, ScannerHandle};
pub use session::SessionCookie;
pub use state::{ScanPhase, ScanStatus};
