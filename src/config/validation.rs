use crate::config::types::{
    Config, MarketplaceConfig, OutputConfig, ProxyConfig, ScannerConfig, SessionConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_marketplace_config(&config.marketplace)?;
    validate_scanner_config(&config.scanner)?;
    validate_session_config(&config.session)?;
    validate_proxy_config(&config.proxy)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_marketplace_config(config: &MarketplaceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    match url.scheme() {
        "https" => {}
        // Plain HTTP is only accepted for local test servers
        "http" if is_loopback(&url) => {}
        other => {
            return Err(ConfigError::Validation(format!(
                "base-url must use HTTPS, got '{}'",
                other
            )))
        }
    }

    if config.per_page < 1 || config.per_page > 960 {
        return Err(ConfigError::Validation(format!(
            "per-page must be between 1 and 960, got {}",
            config.per_page
        )));
    }

    if config.order.is_empty() {
        return Err(ConfigError::Validation("order cannot be empty".to_string()));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be between 1 and 120, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

fn validate_scanner_config(config: &ScannerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 2 || config.max_concurrency > 256 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 2 and 256, got {}",
            config.max_concurrency
        )));
    }

    if config.bootstrap_initial_backoff_ms == 0 {
        return Err(ConfigError::Validation(
            "bootstrap-initial-backoff-ms must be > 0".to_string(),
        ));
    }

    if config.bootstrap_max_backoff_ms < config.bootstrap_initial_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "bootstrap-max-backoff-ms ({}) must be >= bootstrap-initial-backoff-ms ({})",
            config.bootstrap_max_backoff_ms, config.bootstrap_initial_backoff_ms
        )));
    }

    Ok(())
}

fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.cookie_name.is_empty() || config.cookie_name.contains(['=', ';', ' ']) {
        return Err(ConfigError::Validation(format!(
            "cookie-name must be a bare cookie name, got '{}'",
            config.cookie_name
        )));
    }

    if let Some(cookie) = &config.cookie {
        if !cookie.contains('=') {
            return Err(ConfigError::Validation(
                "cookie must be in 'name=value' form".to_string(),
            ));
        }
    }

    if config.refresh_interval_secs < 5 {
        return Err(ConfigError::Validation(format!(
            "refresh-interval-secs must be >= 5, got {}",
            config.refresh_interval_secs
        )));
    }

    Ok(())
}

fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    for proxy in &config.urls {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(ConfigError::Validation(format!(
                "Proxy '{}' must use http, https, socks5 or socks5h",
                proxy
            )));
        }
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn is_loopback(url: &Url) -> bool {
    matches!(url.host_str(), Some("127.0.0.1") | Some("localhost") | Some("[::1]"))
}
