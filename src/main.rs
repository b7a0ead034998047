//! Catalog-Scout main entry point
//!
//! This is the command-line interface for the Catalog-Scout marketplace scanner.

use anyhow::Context;
use catalog_scout::config::{load_config_with_hash, Config};
use catalog_scout::output::{load_statistics, print_statistics};
use catalog_scout::scanner::scan;
use catalog_scout::storage::SqliteStorage;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Catalog-Scout: an adaptive marketplace catalog scanner
///
/// Catalog-Scout finds the newest listed item, then probes item IDs past it as
/// they are published, adapting its step size and concurrency to the listing
/// rate. Found items are journaled to SQLite.
#[derive(Parser, Debug)]
#[command(name = "catalog-scout")]
#[command(version = "1.0.0")]
#[command(about = "An adaptive marketplace catalog scanner", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be scanned without scanning
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the item journal and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_scan(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_scout=info,warn"),
            1 => EnvFilter::new("catalog_scout=debug,info"),
            2 => EnvFilter::new("catalog_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be scanned
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Scout Dry Run ===\n");

    println!("Marketplace:");
    println!("  Base URL: {}", config.marketplace.base_url);
    println!("  Catalog page size: {}", config.marketplace.per_page);
    println!("  Catalog order: {}", config.marketplace.order);
    println!(
        "  Request timeout: {}s",
        config.marketplace.request_timeout_secs
    );

    println!("\nScanner:");
    println!("  Max concurrency: {}", config.scanner.max_concurrency);
    println!(
        "  Rate-limit pause: {}ms",
        config.scanner.rate_limit_pause_ms
    );
    println!(
        "  Bootstrap backoff: {}ms .. {}ms",
        config.scanner.bootstrap_initial_backoff_ms, config.scanner.bootstrap_max_backoff_ms
    );

    println!("\nSession:");
    match &config.session.cookie {
        Some(_) => println!("  Static cookie (no refresh)"),
        None => println!(
            "  Acquire '{}' from the marketplace, refresh every {}s",
            config.session.cookie_name, config.session.refresh_interval_secs
        ),
    }

    println!("\nProxies ({}):", config.proxy.urls.len());
    for url in &config.proxy.urls {
        println!("  - {}", url);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the item journal
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main scan: runs until Ctrl-C
async fn handle_scan(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let ctrl_c = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down");
            }
            shutdown.cancel();
        })
    };

    let result = scan(config, config_hash, shutdown).await;
    ctrl_c.abort();

    if let Some(summary) = result.context("Scan failed")? {
        tracing::info!(
            "Scan run {} finished: {} item(s) delivered, {} newly journaled, highest ID {}",
            summary.run_id,
            summary.status.items_delivered,
            summary.items_journaled,
            summary.status.highest_found
        );
    }

    Ok(())
}
