//! Integration tests for the scanner
//!
//! These tests use wiremock to stand in for the marketplace API.

mod fetch_tests;
mod scan_tests;
mod session_tests;

use catalog_scout::config::MarketplaceConfig;
use catalog_scout::scanner::{build_http_client, HttpPool};
use std::time::Duration;

/// Marketplace config pointing at a mock server
pub fn marketplace_config(base_url: &str) -> MarketplaceConfig {
    MarketplaceConfig {
        base_url: base_url.to_string(),
        per_page: 96,
        order: "newest_first".to_string(),
        request_timeout_secs: 5,
    }
}

/// Single direct client with the given timeout
pub fn direct_pool(timeout: Duration) -> HttpPool {
    HttpPool::from_clients(vec![build_http_client(timeout, None).unwrap()])
}
