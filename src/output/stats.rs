//! Statistics generation from the item journal
//!
//! This module provides functionality for extracting and displaying
//! journal statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::ScoutError;

/// Number of brands listed by `print_statistics`
const TOP_BRANDS: usize = 10;

/// Journal statistics summary
#[derive(Debug, Clone)]
pub struct ScanStatistics {
    /// Total number of items journaled
    pub total_items: u64,

    /// Number of scan runs recorded
    pub total_runs: u64,

    /// Highest item ID seen so far
    pub highest_item_id: Option<u64>,

    pub latest_run: Option<RunRecord>,

    /// Items journaled by the latest run
    pub latest_run_items: u64,

    /// Most frequent brands with their item counts
    pub top_brands: Vec<(String, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(ScanStatistics)` - Successfully loaded statistics
/// * `Err(ScoutError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<ScanStatistics, ScoutError> {
    let latest_run = storage.get_latest_run()?;
    let latest_run_items = match &latest_run {
        Some(run) => storage.count_items_for_run(run.id)?,
        None => 0,
    };

    Ok(ScanStatistics {
        total_items: storage.count_items()?,
        total_runs: storage.count_runs()?,
        highest_item_id: storage.highest_item_id()?,
        latest_run,
        latest_run_items,
        top_brands: storage.top_brands(TOP_BRANDS)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ScanStatistics) {
    println!("=== Scan Statistics ===\n");

    println!("Overview:");
    println!("  Total items journaled: {}", stats.total_items);
    println!("  Scan runs: {}", stats.total_runs);
    match stats.highest_item_id {
        Some(id) => println!("  Highest item ID: {}", id),
        None => println!("  Highest item ID: -"),
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run (#{}):", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        println!(
            "  Finished: {}",
            run.finished_at.as_deref().unwrap_or("(still running or interrupted)")
        );
        println!("  Items journaled: {}", stats.latest_run_items);
        println!();
    }

    if !stats.top_brands.is_empty() {
        println!("Top Brands:");
        for (brand, count) in &stats.top_brands {
            let percentage = if stats.total_items > 0 {
                (*count as f64 / stats.total_items as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", brand, count, percentage);
        }
    }
}
