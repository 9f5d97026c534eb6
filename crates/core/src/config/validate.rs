use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - A configured API key is not blank
/// - A `[tmdb]` section carries credentials and a non-zero timeout
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config
        .auth
        .api_key
        .as_deref()
        .is_some_and(|k| k.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key cannot be empty (omit it to disable authentication)".to_string(),
        ));
    }

    if let Some(tmdb) = &config.tmdb {
        if !tmdb.has_credentials() {
            return Err(ConfigError::ValidationError(
                "tmdb requires access_token or api_key".to_string(),
            ));
        }
        if tmdb.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tmdb.timeout_secs cannot be 0".to_string(),
            ));
        }
    }

    Ok(())
}
