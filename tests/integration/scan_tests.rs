//! End-to-end scans against a mock marketplace

use crate::{direct_pool, marketplace_config};
use catalog_scout::config::{Config, OutputConfig, ProxyConfig, ScannerConfig, SessionConfig};
use catalog_scout::output::spawn_journal_writer;
use catalog_scout::scanner::{scan, HttpMarketplace, Scanner};
use catalog_scout::storage::{RunStatus, SqliteStorage, Storage};
use catalog_scout::{CatalogItem, ScanPhase, SessionCookie};
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOOTSTRAP_ID: u64 = 1_000;
const LAST_LISTED_ID: u64 = 1_003;

/// Catalog tops out at 1000; items 1001..=1003 were listed just now
async fn mock_marketplace() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/catalog/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": 998 }, { "id": BOOTSTRAP_ID }, { "id": 990 }]
        })))
        .mount(&server)
        .await;

    for id in BOOTSTRAP_ID + 1..=LAST_LISTED_ID {
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/items/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "item": {
                    "id": id,
                    "title": format!("Listing {}", id),
                    "brand_title": "Acme",
                    "updated_at_ts": Utc::now().to_rfc3339(),
                }
            })))
            .mount(&server)
            .await;
    }

    server
}

fn scanner_config() -> ScannerConfig {
    ScannerConfig {
        max_concurrency: 2,
        rate_limit_pause_ms: 3_000,
        bootstrap_initial_backoff_ms: 50,
        bootstrap_max_backoff_ms: 200,
    }
}

async fn probed_ids(server: &MockServer) -> Vec<u64> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter_map(|r| r.url.path().strip_prefix("/api/v2/items/")?.parse().ok())
        .collect()
}

#[tokio::test]
async fn test_scan_delivers_new_items_once() {
    let server = mock_marketplace().await;
    let api = Arc::new(
        HttpMarketplace::new(
            direct_pool(Duration::from_secs(5)),
            SessionCookie::new(),
            &marketplace_config(&server.uri()),
        )
        .unwrap(),
    );

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    let handle = Scanner::new(api, &scanner_config())
        .start(move |item: CatalogItem| sink.lock().unwrap().push(item.id));

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(handle.status().borrow().phase, ScanPhase::Scanning);
    let status = handle.stop().await;

    let delivered = delivered.lock().unwrap().clone();
    assert!(!delivered.is_empty());
    let unique: HashSet<u64> = delivered.iter().copied().collect();
    assert_eq!(unique.len(), delivered.len());
    assert!(delivered
        .iter()
        .all(|id| (BOOTSTRAP_ID + 1..=LAST_LISTED_ID).contains(id)));

    assert_eq!(status.phase, ScanPhase::Stopped);
    assert!(status.highest_found <= LAST_LISTED_ID);
    assert!(probed_ids(&server).await.iter().all(|id| *id > BOOTSTRAP_ID));
}

#[tokio::test]
async fn test_scan_journals_found_items() {
    let server = mock_marketplace().await;
    let api = Arc::new(
        HttpMarketplace::new(
            direct_pool(Duration::from_secs(5)),
            SessionCookie::fixed("access_token_web=test"),
            &marketplace_config(&server.uri()),
        )
        .unwrap(),
    );

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("journal.db");
    let mut storage = SqliteStorage::new(&db_path).unwrap();
    let run_id = storage.create_run("test_hash").unwrap();

    let (sender, writer) = spawn_journal_writer(storage, run_id);
    let handle = Scanner::new(api, &scanner_config()).start(sender);

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let status = handle.stop().await;

    let (mut storage, recorded) = writer.await.unwrap();
    storage.complete_run(run_id, recorded).unwrap();

    assert!(recorded > 0);
    assert_eq!(recorded, status.items_delivered);
    assert_eq!(storage.count_items_for_run(run_id).unwrap(), recorded);
    assert!(storage.highest_item_id().unwrap().unwrap() <= LAST_LISTED_ID);
    drop(storage);

    // Journal survives reopening
    let reopened = SqliteStorage::new(Path::new(&db_path)).unwrap();
    assert_eq!(reopened.count_items().unwrap(), recorded);
}

fn run_config(base_url: &str, database_path: &Path, session: SessionConfig) -> Config {
    Config {
        marketplace: marketplace_config(base_url),
        scanner: scanner_config(),
        session,
        proxy: ProxyConfig::default(),
        output: OutputConfig {
            database_path: database_path.to_string_lossy().into_owned(),
        },
    }
}

#[tokio::test]
async fn test_failed_setup_records_no_run() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("journal.db");
    let config = run_config(
        "not a url",
        &db_path,
        SessionConfig {
            cookie: Some("access_token_web=test".to_string()),
            ..SessionConfig::default()
        },
    );

    let result = scan(config, "test_hash", CancellationToken::new()).await;
    assert!(result.is_err());

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_runs().unwrap(), 0);
    assert!(storage.get_latest_run().unwrap().is_none());
}

#[tokio::test]
async fn test_shutdown_before_cookie_records_no_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("journal.db");
    let config = run_config(&server.uri(), &db_path, SessionConfig::default());

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let summary = scan(config, "test_hash", shutdown).await.unwrap();
    assert!(summary.is_none());
    assert_eq!(SqliteStorage::new(&db_path).unwrap().count_runs().unwrap(), 0);
}

#[tokio::test]
async fn test_scan_run_acquires_cookie_and_completes() {
    let server = mock_marketplace().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "access_token_web=live; Path=/"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("journal.db");
    let config = run_config(
        &server.uri(),
        &db_path,
        SessionConfig {
            refresh_interval_secs: 1,
            ..SessionConfig::default()
        },
    );

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        trigger.cancel();
    });

    let summary = scan(config, "test_hash", shutdown)
        .await
        .unwrap()
        .expect("cookie was available");

    assert!(summary.items_journaled > 0);
    assert_eq!(summary.items_journaled, summary.status.items_delivered);
    assert_eq!(summary.status.phase, ScanPhase::Stopped);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, summary.run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.items_found, summary.items_journaled);
    assert_eq!(storage.count_runs().unwrap(), 1);
}
