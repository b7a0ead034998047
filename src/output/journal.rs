//! Item journal writer
//!
//! The scanner callback must not block on disk, so it only pushes items into an
//! unbounded channel. A blocking writer task drains the channel into storage.

use crate::catalog::CatalogItem;
use crate::scanner::ItemHandler;
use crate::storage::{ItemRecord, SqliteStorage, Storage};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Scanner callback that forwards found items to the journal writer
#[derive(Debug, Clone)]
pub struct JournalSender {
    tx: mpsc::UnboundedSender<CatalogItem>,
}

impl ItemHandler for JournalSender {
    fn on_item_found(&mut self, item: CatalogItem) {
        let price = item.price_text();
        tracing::info!(
            id = item.id,
            brand = item.brand.as_deref().unwrap_or("-"),
            price = price.as_deref().unwrap_or("-"),
            "{}",
            item.title.as_deref().unwrap_or("(untitled)")
        );

        if self.tx.send(item).is_err() {
            tracing::warn!("Journal writer has stopped, item not recorded");
        }
    }
}

/// Starts the writer and returns the callback feeding it
///
/// The writer finishes once every `JournalSender` clone has been dropped and
/// yields the storage back along with the number of newly journaled items.
pub fn spawn_journal_writer(
    mut storage: SqliteStorage,
    run_id: i64,
) -> (JournalSender, JoinHandle<(SqliteStorage, u64)>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<CatalogItem>();

    let handle = tokio::task::spawn_blocking(move || {
        let mut recorded = 0u64;

        while let Some(item) = rx.blocking_recv() {
            let record = match ItemRecord::from_item(&item, Utc::now()) {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(id = item.id, "Failed to serialize item: {}", e);
                    continue;
                }
            };

            match storage.record_item(run_id, &record) {
                Ok(true) => recorded += 1,
                Ok(false) => tracing::debug!(id = item.id, "Item already journaled"),
                Err(e) => tracing::error!(id = item.id, "Failed to journal item: {}", e),
            }
        }

        (storage, recorded)
    });

    (JournalSender { tx }, handle)
}
