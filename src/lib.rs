//! PageCrunch: crawl-state tracking and content normalization for AI data pipelines
//!
//! This crate implements the core of a scoped web crawler. It does not fetch
//! anything itself: an orchestrator hands it already-fetched pages and resolved
//! robots data, and the core decides whether a URL needs refetching, gates pages
//! through robots rules, extracts the main content region, fingerprints it,
//! tracks it across runs, and converts it to normalized markdown.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod hash;
pub mod markdown;
pub mod output;
pub mod refresh;
pub mod robots;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for PageCrunch operations
#[derive(Debug, Error)]
pub enum CrunchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Markdown conversion error: {0}")]
    Conversion(#[from] markdown::ConversionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl CrunchError {
    /// Returns true if this error must abort the whole run
    ///
    /// Only an unusable tracking store and invalid configuration are
    /// process-fatal. Everything else, including a worker that panicked on
    /// one page, is scoped to a single URL.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Storage(e) => e.is_fatal(),
            _ => false,
        }
    }
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

    #[error("Invalid refresh policy: {0}")]
    Policy(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for PageCrunch operations
pub type Result<T> = std::result::Result<T, CrunchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Emission, FetchedPage, PageProcessor, PageRecord};
pub use hash::{fingerprint, ContentHash};
pub use refresh::{decide, PolicyDecision, RefreshMode};
pub use storage::{ContentStatus, CrawlRecord, SqliteTrackingStore, TrackingStore};
pub use url::normalize_url;
