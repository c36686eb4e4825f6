use reqwest::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Engine base URL is an http(s) URL with a host
/// - Page size and max pages are not 0
/// - HTTP timeout is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Engine validation
    let url = Url::parse(&config.engine.base_url).map_err(|e| {
        ConfigError::ValidationError(format!(
            "engine.base_url is not a valid URL ({}): {}",
            config.engine.base_url, e
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "engine.base_url must be an http(s) URL with a host: {}",
            config.engine.base_url
        )));
    }

    if config.engine.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "engine.page_size cannot be 0".to_string(),
        ));
    }

    if config.engine.max_pages == Some(0) {
        return Err(ConfigError::ValidationError(
            "engine.max_pages cannot be 0".to_string(),
        ));
    }

    // HTTP validation
    if config.http.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "http.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
