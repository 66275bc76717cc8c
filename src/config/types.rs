use crate::extract::ContentMode;
use crate::markdown::MarkdownOptions;
use crate::refresh::{RefreshMode, RefreshPolicy, SkipOutput};
use crate::url::CrawlScope;
use crate::{ConfigError, ConfigResult, UrlResult};
use serde::Deserialize;

/// Default location of the URL tracking database
pub const DEFAULT_DATABASE_PATH: &str = "pagecrunch_urls.db";

/// Default upper bound on HTML handed to the markdown converter (8 MiB)
pub const DEFAULT_MAX_MARKDOWN_INPUT: usize = 8 * 1024 * 1024;

/// Main configuration structure for PageCrunch
///
/// A run's configuration is loaded once, validated, and then passed by
/// reference into every component; nothing mutates it afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub markdown: MarkdownConfig,
    #[serde(rename = "prime-directive", default)]
    pub prime_directive: PrimeDirectiveConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Crawl scope configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// URL the crawl starts from; also supplies the default domain
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Allowed domain (defaults to the start URL's host)
    #[serde(default)]
    pub domain: Option<String>,

    /// Treat subdomains of the top domain as in scope
    #[serde(rename = "ignore-subdomains", default = "default_true")]
    pub ignore_subdomains: bool,

    /// Optional path prefix restricting the crawl to a subtree
    #[serde(rename = "path-prefix", default)]
    pub path_prefix: Option<String>,

    /// User agent matched against robots.txt groups
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum number of pages processed concurrently by the batch coordinator
    #[serde(rename = "max-concurrent-pages", default = "default_concurrency")]
    pub max_concurrent_pages: usize,
}

impl CrawlConfig {
    /// Builds the crawl scope described by this section
    pub fn scope(&self) -> UrlResult<CrawlScope> {
        CrawlScope::from_start_url(
            &self.start_url,
            self.domain.as_deref(),
            self.ignore_subdomains,
            self.path_prefix.as_deref(),
        )
    }
}

/// Refresh policy configuration
///
/// `mode` and `days` are kept in their raw form here so that an unknown mode
/// or a non-positive day count surfaces as a policy error at startup rather
/// than as a generic TOML error.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_mode")]
    pub mode: String,

    #[serde(default = "default_refresh_days")]
    pub days: i64,

    /// Re-emit the stored record for URLs the policy skips
    #[serde(rename = "output-cache", default)]
    pub output_cache: bool,

    /// What to emit for a skipped URL when `output-cache` is off
    #[serde(rename = "on-skip", default)]
    pub on_skip: SkipOutput,
}

impl RefreshConfig {
    /// Converts the raw section into a typed [`RefreshPolicy`]
    ///
    /// # Returns
    ///
    /// * `Ok(RefreshPolicy)` - The mode is known and the day count is positive
    /// * `Err(ConfigError::Policy)` - Otherwise
    pub fn policy(&self) -> ConfigResult<RefreshPolicy> {
        let mode: RefreshMode = self.mode.parse().map_err(ConfigError::Policy)?;

        if self.days <= 0 {
            return Err(ConfigError::Policy(format!(
                "refresh days must be positive, got {}",
                self.days
            )));
        }
        let days = u32::try_from(self.days).map_err(|_| {
            ConfigError::Policy(format!("refresh days out of range: {}", self.days))
        })?;

        Ok(RefreshPolicy {
            mode,
            days,
            output_cache: self.output_cache,
            on_skip: self.on_skip,
        })
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            mode: default_refresh_mode(),
            days: default_refresh_days(),
            output_cache: false,
            on_skip: SkipOutput::default(),
        }
    }
}

/// Content extraction configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentConfig {
    #[serde(default)]
    pub mode: ContentMode,
}

/// Markdown conversion configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownConfig {
    /// Emit markdown fields alongside the HTML content
    #[serde(default)]
    pub enabled: bool,

    #[serde(flatten)]
    pub options: MarkdownOptions,

    /// Inputs larger than this are not converted
    #[serde(rename = "max-input-bytes", default = "default_max_markdown_input")]
    pub max_input_bytes: usize,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            options: MarkdownOptions::default(),
            max_input_bytes: DEFAULT_MAX_MARKDOWN_INPUT,
        }
    }
}

/// Robots exclusion enforcement ("PrimeDirective")
#[derive(Debug, Clone, Deserialize)]
pub struct PrimeDirectiveConfig {
    /// When false, robots rules and meta directives are ignored entirely
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Deny pages carrying a `nofollow` meta directive, not only their links
    #[serde(rename = "honor-nofollow", default)]
    pub honor_nofollow: bool,
}

impl Default for PrimeDirectiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            honor_nofollow: false,
        }
    }
}

/// Tracking store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Maximum number of idle pooled connections
    #[serde(rename = "max-connections", default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "PageCrunch".to_string()
}

fn default_concurrency() -> usize {
    8
}

fn default_refresh_mode() -> String {
    "auto".to_string()
}

fn default_refresh_days() -> i64 {
    7
}

fn default_max_markdown_input() -> usize {
    DEFAULT_MAX_MARKDOWN_INPUT
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

fn default_max_connections() -> usize {
    4
}
