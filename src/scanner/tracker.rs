//! Outcome tracking for the scan loop
//!
//! Every fetch outcome lands here. The tracker keeps:
//! - Per-second window counters, rolled by the coordinator once a second
//! - The consecutive not-found count
//! - The publication clock: the newest found item's own update time

use crate::scanner::FetchOutcome;
use chrono::{DateTime, Duration, Utc};

/// Age given to the publication clock before anything has been found
const INITIAL_PUBLICATION_AGE_MS: i64 = 10_000;

/// Counters for one 1-second window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowCounters {
    pub requests: u32,
    pub valid_items: u32,
    pub not_found: u32,
    pub rate_limited: u32,
    pub forbidden: u32,
    pub other_errors: u32,
    pub min_found_id: Option<u64>,
    pub max_found_id: Option<u64>,
}

/// Timestamp and ID of the newest found item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicationClock {
    pub id: u64,
    pub published_at: DateTime<Utc>,
}

/// Rolling outcome counters and the publication clock
#[derive(Debug, Clone)]
pub struct OutcomeTracker {
    window: WindowCounters,
    previous: Option<WindowCounters>,
    consecutive_errors: u32,
    publication: PublicationClock,
    highest_found: u64,
}

impl OutcomeTracker {
    /// Creates a tracker whose publication clock starts ten seconds in the past,
    /// so scanning starts out accelerating
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            window: WindowCounters::default(),
            previous: None,
            consecutive_errors: 0,
            publication: PublicationClock {
                id: 0,
                published_at: now - Duration::milliseconds(INITIAL_PUBLICATION_AGE_MS),
            },
            highest_found: 0,
        }
    }

    /// Counts a launched request
    pub fn record_request(&mut self) {
        self.window.requests += 1;
    }

    /// Folds one completed fetch into the counters
    pub fn record(&mut self, id: u64, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Found(item) => {
                self.window.valid_items += 1;
                self.window.min_found_id = Some(self.window.min_found_id.map_or(id, |m| m.min(id)));
                self.window.max_found_id = Some(self.window.max_found_id.map_or(id, |m| m.max(id)));
                self.consecutive_errors = 0;
                self.highest_found = self.highest_found.max(id);
                self.record_publication(id, item.published_at());
            }
            FetchOutcome::NotFound => {
                self.window.not_found += 1;
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
            }
            FetchOutcome::RateLimited => self.window.rate_limited += 1,
            FetchOutcome::Forbidden => self.window.forbidden += 1,
            FetchOutcome::OtherError(_) => self.window.other_errors += 1,
        }
    }

    /// Moves the publication clock forward
    ///
    /// Ignored when `id` is older than the recorded one, or when the remote
    /// timestamp could not be parsed. Returns whether the clock moved.
    pub fn record_publication(&mut self, id: u64, published_at: Option<DateTime<Utc>>) -> bool {
        let Some(published_at) = published_at else {
            return false;
        };
        if id < self.publication.id {
            return false;
        }
        self.publication = PublicationClock { id, published_at };
        true
    }

    /// Returns the current window and starts a new one
    ///
    /// The returned window becomes the "prior" window for concurrency decisions.
    pub fn snapshot(&mut self) -> WindowCounters {
        let window = std::mem::take(&mut self.window);
        self.previous = Some(window.clone());
        window
    }

    /// Milliseconds since the publication clock, never negative
    pub fn since_publication_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.publication.published_at).num_milliseconds().max(0)
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn rate_limited_this_second(&self) -> u32 {
        self.window.rate_limited
    }

    pub fn current_window(&self) -> &WindowCounters {
        &self.window
    }

    pub fn previous_window(&self) -> Option<&WindowCounters> {
        self.previous.as_ref()
    }

    pub fn publication(&self) -> PublicationClock {
        self.publication
    }

    /// Highest ID that ever produced a found outcome (0 if none)
    pub fn highest_found(&self) -> u64 {
        self.highest_found
    }
}
