//! Scanner module for adaptive catalog scanning
//!
//! This module contains the core scanning logic, including:
//! - HTTP fetching and outcome classification
//! - Frontier discovery from the catalog listing
//! - Step and concurrency control
//! - Overall scan coordination
//! - Running a journaled scan from config

mod bootstrap;
mod concurrency;
mod coordinator;
mod fetcher;
mod frontier;
mod runner;
mod step;
mod tracker;

pub use bootstrap::{discover_frontier, find_highest_id, BackoffPolicy, Bootstrap};
pub use concurrency::{ConcurrencyController, RetargetSignals, MIN_CONCURRENCY};
pub use coordinator::{ItemHandler, ScanSettings, Scanner, ScannerHandle};
pub use fetcher::{
    build_http_client, catalog_url, fetch_catalog_page, fetch_item, item_url, FetchOutcome,
    HttpMarketplace, HttpPool, MarketplaceApi,
};
pub use frontier::Frontier;
pub use runner::{run_scan, ScanSummary};
pub use step::{StepController, MAX_STEP, MIN_STEP, OVERRUN_ERROR_THRESHOLD};
pub use tracker::{OutcomeTracker, PublicationClock, WindowCounters};

use crate::config::Config;
use crate::ScoutError;
use tokio_util::sync::CancellationToken;

/// Runs a complete scan operation
///
/// This is the main entry point for starting a scan. It will:
/// 1. Open the item journal
/// 2. Build the HTTP pool and marketplace client
/// 3. Obtain a session cookie (static or acquired, then refreshed)
/// 4. Record a new run
/// 5. Scan and journal found items until `shutdown` fires
/// 6. Mark the run completed
///
/// # Returns
///
/// * `Ok(Some(summary))` - Scan ran and its run was completed
/// * `Ok(None)` - Shutdown came before a session cookie; no run was recorded
/// * `Err(ScoutError)` - Setup or the journal failed
pub async fn scan(
    config: Config,
    config_hash: &str,
    shutdown: CancellationToken,
) -> Result<Option<ScanSummary>, ScoutError> {
    run_scan(config, config_hash, shutdown).await
}
