use crate::config::types::{Config, CrawlConfig, MarkdownConfig, RefreshConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_refresh_config(&config.refresh)?;
    validate_markdown_config(&config.markdown)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates crawl scope configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.start_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid start-url '{}': {}", config.start_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start-url '{}' must use http or https",
            config.start_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "start-url '{}' has no host",
            config.start_url
        )));
    }

    if let Some(domain) = &config.domain {
        validate_domain_string(domain)?;
    }

    if let Some(prefix) = &config.path_prefix {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "path-prefix must start with '/', got '{}'",
                prefix
            )));
        }
    }

    validate_user_agent(&config.user_agent)?;

    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 256 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-pages must be between 1 and 256, got {}",
            config.max_concurrent_pages
        )));
    }

    Ok(())
}

/// Validates the refresh policy; failures are policy errors
fn validate_refresh_config(config: &RefreshConfig) -> Result<(), ConfigError> {
    config.policy().map(|_| ())
}

/// Validates markdown conversion configuration
fn validate_markdown_config(config: &MarkdownConfig) -> Result<(), ConfigError> {
    if config.max_input_bytes == 0 {
        return Err(ConfigError::Validation(
            "markdown max-input-bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validates tracking store configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.max_connections < 1 || config.max_connections > 64 {
        return Err(ConfigError::Validation(format!(
            "max-connections must be between 1 and 64, got {}",
            config.max_connections
        )));
    }

    Ok(())
}

/// Validates a user agent token: non-empty, no whitespace or control characters
fn validate_user_agent(user_agent: &str) -> Result<(), ConfigError> {
    if user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if !user_agent
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
    {
        return Err(ConfigError::Validation(format!(
            "user-agent may only contain alphanumerics and '-', '_', '.', '/', got '{}'",
            user_agent
        )));
    }

    Ok(())
}

/// Validates a domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::Validation(
            "Domain cannot be empty".to_string(),
        ));
    }

    // Check for invalid characters
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    // Check that it doesn't start or end with a dot or hyphen
    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_domain_string() {
        assert!(validate_domain_string("example.com").is_ok());
        assert!(validate_domain_string("docs.example.com").is_ok());
        assert!(validate_domain_string("localhost").is_ok());

        assert!(validate_domain_string("").is_err());
        assert!(validate_domain_string(".example.com").is_err());
        assert!(validate_domain_string("example.com.").is_err());
        assert!(validate_domain_string("exa mple.com").is_err());
        assert!(validate_domain_string("example..com").is_err());
    }

    #[test]
    fn test_validate_user_agent() {
        assert!(validate_user_agent("PageCrunch").is_ok());
        assert!(validate_user_agent("PageCrunch/1.0").is_ok());

        assert!(validate_user_agent("").is_err());
        assert!(validate_user_agent("Page Crunch").is_err());
    }

    #[test]
    fn test_refresh_errors_are_policy_errors() {
        let config = RefreshConfig {
            mode: "sometimes".to_string(),
            ..RefreshConfig::default()
        };
        assert!(matches!(
            validate_refresh_config(&config),
            Err(ConfigError::Policy(_))
        ));

        let config = RefreshConfig {
            days: 0,
            ..RefreshConfig::default()
        };
        assert!(matches!(
            validate_refresh_config(&config),
            Err(ConfigError::Policy(_))
        ));
    }
}
