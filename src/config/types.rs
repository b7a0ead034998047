use serde::Deserialize;

/// Main configuration structure for Catalog-Scout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub marketplace: MarketplaceConfig,
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub output: OutputConfig,
}

/// Marketplace API endpoints and request behavior
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
    /// Origin of the marketplace, e.g. `https://www.vinted.fr`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of items requested from the catalog listing during bootstrap
    #[serde(rename = "per-page", default = "default_per_page")]
    pub per_page: u32,

    /// Sort order passed to the catalog listing
    #[serde(default = "default_order")]
    pub order: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Scan loop tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Ceiling for the number of simultaneously in-flight item fetches
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: usize,

    /// Pause applied when too many rate-limited responses arrive in one second (milliseconds)
    #[serde(rename = "rate-limit-pause-ms", default = "default_rate_limit_pause_ms")]
    pub rate_limit_pause_ms: u64,

    /// First delay between failed bootstrap attempts (milliseconds)
    #[serde(
        rename = "bootstrap-initial-backoff-ms",
        default = "default_bootstrap_initial_backoff_ms"
    )]
    pub bootstrap_initial_backoff_ms: u64,

    /// Upper bound for the bootstrap retry delay (milliseconds)
    #[serde(
        rename = "bootstrap-max-backoff-ms",
        default = "default_bootstrap_max_backoff_ms"
    )]
    pub bootstrap_max_backoff_ms: u64,
}

/// Session cookie handling
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Static cookie (`name=value`). When set, the cookie is never refreshed.
    #[serde(default)]
    pub cookie: Option<String>,

    /// Name of the session cookie issued by the marketplace origin
    #[serde(rename = "cookie-name", default = "default_cookie_name")]
    pub cookie_name: String,

    /// How often the session cookie is re-acquired (seconds)
    #[serde(rename = "refresh-interval-secs", default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie: None,
            cookie_name: default_cookie_name(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

/// Outbound proxies, rotated per request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite item journal
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_per_page() -> u32 {
    96
}

fn default_order() -> String {
    "newest_first".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_rate_limit_pause_ms() -> u64 {
    3000
}

fn default_bootstrap_initial_backoff_ms() -> u64 {
    250
}

fn default_bootstrap_max_backoff_ms() -> u64 {
    10_000
}

fn default_cookie_name() -> String {
    "access_token_web".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    60
}
