//! Scan runner - wires config, session, journal and scanner into one run

use crate::config::Config;
use crate::output::spawn_journal_writer;
use crate::scanner::{HttpMarketplace, HttpPool, Scanner};
use crate::session::{acquire_until_successful, spawn_refresh_loop, SessionCookie};
use crate::state::ScanStatus;
use crate::storage::{SqliteStorage, Storage};
use crate::ScoutError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often the runner logs a progress line
const PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// What one finished run produced
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub run_id: i64,
    /// Final scheduler snapshot
    pub status: ScanStatus,
    /// Items newly written to the journal (duplicates of earlier runs excluded)
    pub items_journaled: u64,
}

/// Runs one scan until `shutdown` fires
///
/// The run row is only created once the journal, HTTP pool, marketplace client
/// and session cookie are all ready, so a failed setup leaves no run behind.
/// Returns `Ok(None)` when shutdown fires before a session cookie is obtained.
pub async fn run_scan(
    config: Config,
    config_hash: &str,
    shutdown: CancellationToken,
) -> Result<Option<ScanSummary>, ScoutError> {
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    let timeout = Duration::from_secs(config.marketplace.request_timeout_secs);
    let pool = HttpPool::new(timeout, &config.proxy)?;
    tracing::info!("HTTP pool ready with {} client(s)", pool.client_count());

    let session = SessionCookie::new();
    let api = Arc::new(HttpMarketplace::new(
        pool.clone(),
        session.clone(),
        &config.marketplace,
    )?);

    let refresh_cancel = shutdown.child_token();
    let refresh = match &config.session.cookie {
        Some(cookie) => {
            session.set(cookie.clone());
            None
        }
        None => {
            tracing::info!("Acquiring session cookie '{}'", config.session.cookie_name);
            let Some(cookie) = acquire_until_successful(
                &pool,
                &config.marketplace.base_url,
                &config.session.cookie_name,
                &shutdown,
            )
            .await
            else {
                tracing::info!("Shutdown before a session cookie was obtained");
                return Ok(None);
            };
            session.set(cookie);

            Some(spawn_refresh_loop(
                pool,
                config.marketplace.base_url.clone(),
                config.session.cookie_name.clone(),
                session,
                Duration::from_secs(config.session.refresh_interval_secs),
                refresh_cancel.clone(),
            ))
        }
    };

    let run_id = storage.create_run(config_hash)?;
    tracing::info!("Starting scan run {}", run_id);

    let (sender, writer) = spawn_journal_writer(storage, run_id);
    let handle = Scanner::new(api, &config.scanner).start(sender);
    let status = handle.status();

    let mut progress = tokio::time::interval(PROGRESS_INTERVAL);
    progress.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = progress.tick() => {
                let snapshot = status.borrow().clone();
                if !snapshot.phase.is_running() {
                    tracing::warn!("Scanner stopped on its own");
                    break;
                }
                tracing::info!(
                    "Progress: {} item(s) found, frontier {}, concurrency {}, {} rate-limit pause(s)",
                    snapshot.items_delivered,
                    snapshot.frontier,
                    snapshot.concurrency_target,
                    snapshot.rate_limit_pauses
                );
            }
        }
    }

    let final_status = handle.stop().await;
    refresh_cancel.cancel();
    if let Some(refresh) = refresh {
        if let Err(e) = refresh.await {
            tracing::error!("Session refresh task ended abnormally: {}", e);
        }
    }

    let (mut storage, recorded) = writer.await?;
    storage.complete_run(run_id, recorded)?;

    Ok(Some(ScanSummary {
        run_id,
        status: final_status,
        items_journaled: recorded,
    }))
}
