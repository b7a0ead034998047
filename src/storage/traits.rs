//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{ItemRecord, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The scanner itself never touches storage; the binary journals the items its
/// callback receives.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new scan run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed with a finish timestamp and item count
    fn complete_run(&mut self, run_id: i64, items_found: u64) -> StorageResult<()>;

    fn count_runs(&self) -> StorageResult<u64>;

    // ===== Item Journal =====

    /// Records a found item
    ///
    /// Returns `false` if the item ID was already journaled.
    fn record_item(&mut self, run_id: i64, item: &ItemRecord) -> StorageResult<bool>;

    fn count_items(&self) -> StorageResult<u64>;

    /// Items journaled by one run
    fn count_items_for_run(&self, run_id: i64) -> StorageResult<u64>;

    /// Highest journaled item ID, if any
    fn highest_item_id(&self) -> StorageResult<Option<u64>>;

    /// Most frequent brands, descending
    fn top_brands(&self, limit: usize) -> StorageResult<Vec<(String, u64)>>;
}
