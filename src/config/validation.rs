use crate::config::types::{
    CatalogConfig, Config, InterestConfig, ProxyConfig, RetryConfig, StorageConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_retry_config(&config.retry)?;
    validate_proxy_config(&config.proxy)?;
    validate_storage_config(&config.storage)?;
    validate_interest_config(&config.interest)?;
    Ok(())
}

/// Validates catalog access configuration
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.page_size < 1 || config.page_size > 500 {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and 500, got {}",
            config.page_size
        )));
    }

    if config.wait_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "wait-timeout-ms must be >= 100ms, got {}ms",
            config.wait_timeout_ms
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

/// Validates network identity configuration
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    match config {
        ProxyConfig::Direct => Ok(()),
        ProxyConfig::Fixed { server, .. } => validate_proxy_server(server),
        ProxyConfig::Ports {
            host,
            first_port,
            pool_size,
            ..
        } => {
            if host.is_empty() {
                return Err(ConfigError::Validation(
                    "proxy host cannot be empty".to_string(),
                ));
            }

            if *pool_size < 1 {
                return Err(ConfigError::Validation(format!(
                    "proxy pool-size must be >= 1, got {}",
                    pool_size
                )));
            }

            let last_port = u32::from(*first_port) + pool_size - 1;
            if last_port > u32::from(u16::MAX) {
                return Err(ConfigError::Validation(format!(
                    "proxy ports {}..={} exceed the port range",
                    first_port, last_port
                )));
            }

            Ok(())
        }
        ProxyConfig::List { servers } => {
            if servers.is_empty() {
                return Err(ConfigError::Validation(
                    "proxy list must contain at least one server".to_string(),
                ));
            }

            for entry in servers {
                validate_proxy_server(&entry.server)?;
            }

            Ok(())
        }
    }
}

/// Validates a single proxy server address
fn validate_proxy_server(server: &str) -> Result<(), ConfigError> {
    let url = Url::parse(server)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy server '{}': {}", server, e)))?;

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Proxy server '{}' has no host",
            server
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the interest list
fn validate_interest_config(config: &InterestConfig) -> Result<(), ConfigError> {
    for category in &config.categories {
        if category.is_empty() || !category.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Validation(format!(
                "interest category ids must be numeric, got '{}'",
                category
            )));
        }
    }

    Ok(())
}
