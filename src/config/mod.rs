//! Configuration module for PageCrunch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use pagecrunch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pagecrunch.toml")).unwrap();
//! println!("Tracking database: {}", config.storage.database_path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ContentConfig, CrawlConfig, MarkdownConfig, PrimeDirectiveConfig, RefreshConfig,
    StorageConfig, DEFAULT_DATABASE_PATH, DEFAULT_MAX_MARKDOWN_INPUT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
