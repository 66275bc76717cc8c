use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use pagecrunch::config::load_config;
///
/// let config = load_config(Path::new("pagecrunch.toml")).unwrap();
/// println!("Refresh mode: {}", config.refresh.mode);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that runs can be correlated with the configuration
/// that produced them.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ContentMode;
    use crate::markdown::HeadingStyle;
    use crate::refresh::{RefreshMode, SkipOutput};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawl]
start-url = "https://docs.example.com/guide/"
path-prefix = "/guide"
ignore-subdomains = false

[refresh]
mode = "force"
days = 3
output-cache = true
on-skip = "stub"

[content]
mode = "body"

[markdown]
enabled = true
heading-style = "setext"
preserve-images = false
code-highlighting = false

[prime-directive]
enabled = false

[storage]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawl.path_prefix.as_deref(), Some("/guide"));
        assert!(!config.crawl.ignore_subdomains);
        let policy = config.refresh.policy().unwrap();
        assert_eq!(policy.mode, RefreshMode::Force);
        assert_eq!(policy.days, 3);
        assert!(policy.output_cache);
        assert_eq!(policy.on_skip, SkipOutput::Stub);
        assert_eq!(config.content.mode, ContentMode::Body);
        assert!(config.markdown.enabled);
        assert_eq!(config.markdown.options.heading_style, HeadingStyle::Setext);
        assert!(!config.markdown.options.preserve_images);
        assert!(config.markdown.options.preserve_tables);
        assert!(!config.markdown.options.code_highlighting);
        assert!(!config.prime_directive.enabled);
        assert_eq!(config.storage.database_path, "./test.db");
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("[crawl]\nstart-url = \"https://example.com/\"\n").unwrap();

        let policy = config.refresh.policy().unwrap();
        assert_eq!(policy.mode, RefreshMode::Auto);
        assert_eq!(policy.days, 7);
        assert!(!policy.output_cache);
        assert_eq!(config.content.mode, ContentMode::Auto);
        assert!(!config.markdown.enabled);
        assert!(config.prime_directive.enabled);
        assert!(config.crawl.ignore_subdomains);
        assert_eq!(config.storage.database_path, "pagecrunch_urls.db");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/pagecrunch.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_refresh_mode_fails_fast() {
        let result = parse_config(
            "[crawl]\nstart-url = \"https://example.com/\"\n[refresh]\nmode = \"weekly\"\n",
        );
        assert!(matches!(result.unwrap_err(), ConfigError::Policy(_)));
    }

    #[test]
    fn test_non_positive_refresh_days_fails_fast() {
        let result = parse_config(
            "[crawl]\nstart-url = \"https://example.com/\"\n[refresh]\ndays = -2\n",
        );
        assert!(matches!(result.unwrap_err(), ConfigError::Policy(_)));
    }

    #[test]
    fn test_invalid_start_url() {
        let result = parse_config("[crawl]\nstart-url = \"ftp://example.com/\"\n");
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidUrl(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }
}
