//! Frontier discovery
//!
//! Before scanning, the scanner needs a starting point: the newest item ID the
//! marketplace currently lists. The catalog listing is retried until it yields
//! one, backing off exponentially between failures.

use crate::config::ScannerConfig;
use crate::scanner::MarketplaceApi;
use crate::ScoutError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Capped exponential backoff between bootstrap attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.bootstrap_initial_backoff_ms),
            max: Duration::from_millis(config.bootstrap_max_backoff_ms),
        }
    }

    /// Delay after `failures` consecutive failed attempts (1-based)
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(20);
        self.initial
            .saturating_mul(1u32 << exponent)
            .min(self.max)
    }
}

/// Outcome of a successful bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bootstrap {
    /// Highest item ID in the listing
    pub frontier: u64,
    /// Number of listing requests it took
    pub attempts: u32,
}

/// Requests the catalog listing once and returns its highest item ID
pub async fn find_highest_id<A>(api: &A) -> Result<u64, ScoutError>
where
    A: MarketplaceApi + ?Sized,
{
    let page = api.fetch_catalog_page().await?;
    page.max_id().ok_or_else(|| ScoutError::EmptyCatalog {
        url: "catalog listing".to_string(),
    })
}

/// Retries `find_highest_id` until it succeeds
///
/// Returns `None` only if `cancel` fires first.
pub async fn discover_frontier<A>(
    api: &A,
    backoff: BackoffPolicy,
    cancel: &CancellationToken,
) -> Option<Bootstrap>
where
    A: MarketplaceApi + ?Sized,
{
    let mut failures = 0u32;

    loop {
        if cancel.is_cancelled() {
            return None;
        }

        let attempt = tokio::select! {
            _ = cancel.cancelled() => return None,
            result = find_highest_id(api) => result,
        };

        match attempt {
            Ok(frontier) => {
                tracing::info!("Highest ID: {} (after {} attempt(s))", frontier, failures + 1);
                return Some(Bootstrap {
                    frontier,
                    attempts: failures + 1,
                });
            }
            Err(e) => {
                failures += 1;
                let delay = backoff.delay(failures);
                tracing::warn!(
                    failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Error fetching highest ID, retrying"
                );

                tokio::select! {
                    _ = cancel.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
