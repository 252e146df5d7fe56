use crate::config::types::{ArchiveConfig, CollectionConfig, Config, HttpConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_storage_config(&config.storage)?;
    validate_collection_config(&config.collection)?;
    validate_archive_config(&config.archive)?;
    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates statistics collection configuration
fn validate_collection_config(config: &CollectionConfig) -> Result<(), ConfigError> {
    if config.interval_minutes < 1 {
        return Err(ConfigError::Validation(format!(
            "collection interval_minutes must be >= 1, got {}",
            config.interval_minutes
        )));
    }

    if config.item_delay_secs < 0.0 || !config.item_delay_secs.is_finite() {
        return Err(ConfigError::Validation(format!(
            "collection item_delay_secs must be a non-negative number, got {}",
            config.item_delay_secs
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "collection batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    Ok(())
}

/// Validates archive check configuration
fn validate_archive_config(config: &ArchiveConfig) -> Result<(), ConfigError> {
    if config.interval_minutes < 1 {
        return Err(ConfigError::Validation(format!(
            "archive interval_minutes must be >= 1, got {}",
            config.interval_minutes
        )));
    }

    if config.item_delay_secs < 0.0 || !config.item_delay_secs.is_finite() {
        return Err(ConfigError::Validation(format!(
            "archive item_delay_secs must be a non-negative number, got {}",
            config.item_delay_secs
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "archive batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    let url = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid archive endpoint: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Archive endpoint must use http or https, got '{}'",
            config.endpoint
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = Config::default();
        config.collection.batch_size = 0;
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let mut config = Config::default();
        config.archive.item_delay_secs = -0.5;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_archive_endpoint_rejected() {
        let mut config = Config::default();
        config.archive.endpoint = "not a url".to_string();
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));

        config.archive.endpoint = "ftp://archive.org".to_string();
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(validate(&config).is_err());
    }
}
