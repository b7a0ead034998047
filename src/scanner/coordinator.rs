//! Scan coordinator - the main scan loop
//!
//! A single task owns every piece of scheduler state (frontier, step, target,
//! counters) and drives it:
//! - Discovering the frontier from the catalog listing
//! - Launching fetches until the in-flight set reaches the concurrency target
//! - Folding completed outcomes into the tracker and handing found items to the callback
//! - Rolling the 1-second window and retargeting concurrency
//! - Pausing when the marketplace rate-limits too often
//!
//! Fetches run as tasks in a `JoinSet`; their results come back to the loop, so
//! no scheduler state is ever shared between tasks.

use crate::catalog::CatalogItem;
use crate::config::ScannerConfig;
use crate::scanner::bootstrap::{discover_frontier, BackoffPolicy};
use crate::scanner::concurrency::{ConcurrencyController, RetargetSignals};
use crate::scanner::frontier::Frontier;
use crate::scanner::step::StepController;
use crate::scanner::tracker::OutcomeTracker;
use crate::scanner::{FetchOutcome, MarketplaceApi};
use crate::state::{ScanPhase, ScanStatus};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// How often the loop wakes up without a completion, and the minimum gap between retargets
const RETARGET_INTERVAL: Duration = Duration::from_millis(100);

/// Length of one counter window
const WINDOW: Duration = Duration::from_secs(1);

/// Rate-limited responses tolerated within one window before pausing
const RATE_LIMIT_THRESHOLD: u32 = 3;

/// Receives every found item, in completion order
pub trait ItemHandler: Send + 'static {
    fn on_item_found(&mut self, item: CatalogItem);
}

impl<F> ItemHandler for F
where
    F: FnMut(CatalogItem) + Send + 'static,
{
    fn on_item_found(&mut self, item: CatalogItem) {
        self(item)
    }
}

/// Tunables for one scanner
#[derive(Debug, Clone, Copy)]
pub struct ScanSettings {
    /// Upper bound on the concurrency target
    pub max_concurrency: usize,
    pub rate_limit_pause: Duration,
    pub backoff: BackoffPolicy,
}

impl ScanSettings {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            rate_limit_pause: Duration::from_millis(config.rate_limit_pause_ms),
            backoff: BackoffPolicy::from_config(config),
        }
    }
}

/// Adaptive scanner over a marketplace API
pub struct Scanner<A: MarketplaceApi> {
    api: Arc<A>,
    settings: ScanSettings,
}

impl<A: MarketplaceApi> Scanner<A> {
    pub fn new(api: Arc<A>, config: &ScannerConfig) -> Self {
        Self::with_settings(api, ScanSettings::from_config(config))
    }

    pub fn with_settings(api: Arc<A>, settings: ScanSettings) -> Self {
        Self { api, settings }
    }

    /// Spawns the scan loop and returns a handle to stop or observe it
    pub fn start<H: ItemHandler>(self, handler: H) -> ScannerHandle {
        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(ScanStatus::default());
        let task = tokio::spawn(self.run(handler, cancel.clone(), status_tx));

        ScannerHandle {
            cancel,
            task,
            status: status_rx,
        }
    }

    /// Runs the scan loop on the current task until `cancel` fires
    ///
    /// In-flight fetches are aborted on the way out; their outcomes are not
    /// delivered.
    pub async fn run<H: ItemHandler>(
        self,
        handler: H,
        cancel: CancellationToken,
        status: watch::Sender<ScanStatus>,
    ) {
        tracing::info!(
            max_concurrency = self.settings.max_concurrency,
            "Discovering newest item ID"
        );

        let Some(bootstrap) = discover_frontier(self.api.as_ref(), self.settings.backoff, &cancel).await
        else {
            advance_phase(&status, ScanPhase::Stopped);
            tracing::info!("Scanner stopped before the frontier was found");
            return;
        };

        let mut scan = ScanLoop::new(self.api, handler, self.settings, bootstrap.frontier, status);
        scan.run(&cancel).await;
    }
}

/// Handle to a running scanner
pub struct ScannerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    status: watch::Receiver<ScanStatus>,
}

impl ScannerHandle {
    /// Live view of the scheduler state
    pub fn status(&self) -> watch::Receiver<ScanStatus> {
        self.status.clone()
    }

    /// Stops launching, drops in-flight fetches and waits for the loop to exit
    pub async fn stop(self) -> ScanStatus {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("Scan loop ended abnormally: {}", e);
        }
        let status = self.status.borrow().clone();
        status
    }
}

/// Moves the published phase forward; moves the lifecycle does not allow are ignored
fn advance_phase(status: &watch::Sender<ScanStatus>, next: ScanPhase) {
    status.send_if_modified(|s| {
        if s.phase.can_transition_to(next) {
            s.phase = next;
            true
        } else {
            tracing::debug!(from = %s.phase, to = %next, "Ignoring phase change");
            false
        }
    });
}

/// State owned by the scan loop once the frontier is known
struct ScanLoop<A: MarketplaceApi, H: ItemHandler> {
    api: Arc<A>,
    handler: H,
    settings: ScanSettings,
    frontier: Frontier,
    step: StepController,
    concurrency: ConcurrencyController,
    tracker: OutcomeTracker,
    in_flight: JoinSet<(u64, FetchOutcome)>,
    in_flight_ids: HashSet<u64>,
    window_started: Instant,
    last_retarget: Instant,
    items_delivered: u64,
    rate_limit_pauses: u64,
    status: watch::Sender<ScanStatus>,
}

impl<A: MarketplaceApi, H: ItemHandler> ScanLoop<A, H> {
    fn new(
        api: Arc<A>,
        handler: H,
        settings: ScanSettings,
        start_id: u64,
        status: watch::Sender<ScanStatus>,
    ) -> Self {
        let now = Instant::now();
        Self {
            api,
            handler,
            settings,
            frontier: Frontier::new(start_id),
            step: StepController::new(),
            concurrency: ConcurrencyController::new(settings.max_concurrency),
            tracker: OutcomeTracker::new(Utc::now()),
            in_flight: JoinSet::new(),
            in_flight_ids: HashSet::new(),
            window_started: now,
            last_retarget: now,
            items_delivered: 0,
            rate_limit_pauses: 0,
            status,
        }
    }

    async fn run(&mut self, cancel: &CancellationToken) {
        advance_phase(&self.status, ScanPhase::Scanning);
        tracing::info!(
            frontier = self.frontier.position(),
            concurrency = self.concurrency.target(),
            "Scanning started"
        );

        let mut tick = tokio::time::interval(RETARGET_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let now = Instant::now();
            self.roll_window_if_due(now);

            if self.tracker.rate_limited_this_second() > RATE_LIMIT_THRESHOLD {
                if !self.pause(cancel).await {
                    break;
                }
                continue;
            }

            self.retarget_if_due(now);
            self.launch_up_to_target();
            self.publish_status();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.handle_joined(joined);
                }
                _ = tick.tick() => {}
            }
        }

        self.in_flight.shutdown().await;
        self.in_flight_ids.clear();
        self.publish_status();
        advance_phase(&self.status, ScanPhase::Stopped);

        tracing::info!(
            frontier = self.frontier.position(),
            highest_found = self.tracker.highest_found(),
            items = self.items_delivered,
            "Scanner stopped"
        );
    }

    /// Holds off new launches for the rate-limit pause
    ///
    /// Fetches that complete meanwhile are still handled, in the window they
    /// complete in. Returns false if `cancel` fired.
    async fn pause(&mut self, cancel: &CancellationToken) -> bool {
        self.rate_limit_pauses += 1;
        tracing::warn!(
            rate_limited = self.tracker.rate_limited_this_second(),
            pause_ms = self.settings.rate_limit_pause.as_millis() as u64,
            "Rate limited, pausing new requests"
        );
        self.publish_status();

        let resume_at = Instant::now() + self.settings.rate_limit_pause;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep_until(resume_at) => return true,
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.roll_window_if_due(Instant::now());
                    self.handle_joined(joined);
                    self.publish_status();
                }
            }
        }
    }

    /// Launches fetches until the in-flight set reaches the target
    ///
    /// Stops early if the next identifier is already being fetched.
    fn launch_up_to_target(&mut self) {
        let now = Utc::now();

        while self.in_flight.len() < self.concurrency.target() {
            let step = self.step.next_step(
                self.tracker.since_publication_ms(now),
                self.tracker.consecutive_errors(),
            );
            let id = self.frontier.advance(step);

            if !self.in_flight_ids.insert(id) {
                tracing::trace!(id, "Already in flight");
                break;
            }

            self.tracker.record_request();
            let api = Arc::clone(&self.api);
            self.in_flight.spawn(async move {
                let outcome = api.fetch_item(id).await;
                (id, outcome)
            });
        }
    }

    fn handle_joined(&mut self, joined: Result<(u64, FetchOutcome), JoinError>) {
        match joined {
            Ok((id, outcome)) => self.handle_outcome(id, outcome),
            Err(e) => {
                tracing::error!("Fetch task failed: {}", e);
                // The failed task's id is unknown; resync once nothing is pending
                if self.in_flight.is_empty() {
                    self.in_flight_ids.clear();
                }
            }
        }
    }

    fn handle_outcome(&mut self, id: u64, outcome: FetchOutcome) {
        self.in_flight_ids.remove(&id);
        self.tracker.record(id, &outcome);
        tracing::trace!(id, outcome = outcome.label(), "Fetch completed");

        match outcome {
            FetchOutcome::Found(item) => {
                self.frontier.raise_floor(id);
                self.items_delivered += 1;
                tracing::debug!(id, title = item.title.as_deref().unwrap_or(""), "Found item");
                self.handler.on_item_found(*item);
            }
            FetchOutcome::NotFound => {}
            FetchOutcome::RateLimited => {
                tracing::warn!(
                    id,
                    "Rate limit error: {}",
                    self.tracker.rate_limited_this_second()
                );
            }
            FetchOutcome::Forbidden => {
                tracing::warn!(id, "Forbidden, the session cookie may be stale");
            }
            FetchOutcome::OtherError(detail) => {
                tracing::debug!(id, error = %detail, "Fetch failed");
            }
        }
    }

    fn roll_window_if_due(&mut self, now: Instant) {
        if now.duration_since(self.window_started) < WINDOW {
            return;
        }
        self.window_started = now;

        let window = self.tracker.snapshot();
        let since_publication = self.tracker.since_publication_ms(Utc::now());
        let found_range = match (window.min_found_id, window.max_found_id) {
            (Some(min), Some(max)) => format!("{}-{}", min, max),
            _ => "-".to_string(),
        };

        tracing::info!(
            "Requests: {}, valid: {}, not found: {}, rate limited: {}, forbidden: {}, \
             errors: {}, found IDs: {}, since publication: {}ms, step: {}, \
             consecutive errors: {}, concurrency: {} ({} in flight), frontier: {}",
            window.requests,
            window.valid_items,
            window.not_found,
            window.rate_limited,
            window.forbidden,
            window.other_errors,
            found_range,
            since_publication,
            self.step.current(),
            self.tracker.consecutive_errors(),
            self.concurrency.target(),
            self.in_flight.len(),
            self.frontier.position()
        );
    }

    fn retarget_if_due(&mut self, now: Instant) {
        if now.duration_since(self.last_retarget) < RETARGET_INTERVAL {
            return;
        }
        self.last_retarget = now;

        let signals = RetargetSignals {
            since_publication_ms: self.tracker.since_publication_ms(Utc::now()),
            consecutive_errors: self.tracker.consecutive_errors(),
            current_valid: self.tracker.current_window().valid_items,
            previous_valid: self.tracker.previous_window().map(|w| w.valid_items),
        };

        let before = self.concurrency.target();
        let after = self.concurrency.retarget(signals);
        if before != after {
            tracing::debug!(
                from = before,
                to = after,
                ceiling = self.concurrency.ceiling(),
                "Concurrency retargeted"
            );
        }
    }

    fn publish_status(&self) {
        let phase = self.status.borrow().phase;
        self.status.send_replace(ScanStatus {
            phase,
            frontier: self.frontier.position(),
            step: self.step.current(),
            concurrency_target: self.concurrency.target(),
            in_flight: self.in_flight.len(),
            consecutive_errors: self.tracker.consecutive_errors(),
            highest_found: self.tracker.highest_found(),
            items_delivered: self.items_delivered,
            rate_limit_pauses: self.rate_limit_pauses,
        });
    }
}
