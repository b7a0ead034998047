//! Storage module for the item journal
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Run tracking
//! - Journaling found items

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::catalog::CatalogItem;
use chrono::{DateTime, Utc};

/// Represents a scan run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub items_found: u64,
}

/// Status of a scan run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

/// A found item as it is journaled
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: u64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub found_at: DateTime<Utc>,
    pub raw_json: String,
}

impl ItemRecord {
    /// Flattens a catalog item, keeping the full payload as JSON
    pub fn from_item(item: &CatalogItem, found_at: DateTime<Utc>) -> Result<Self, StorageError> {
        Ok(Self {
            id: item.id,
            title: item.title.clone(),
            url: item.url.clone(),
            brand: item.brand.clone(),
            price: item.price_text(),
            currency: item.currency.clone(),
            published_at: item.published_at(),
            found_at,
            raw_json: serde_json::to_string(item)?,
        })
    }
}
