//! Concurrency controller
//!
//! Tracks how many item fetches may be in flight. Sparse discovery earns more
//! parallel probes; dense discovery, overrun and empty windows shed them.

use crate::scanner::step::OVERRUN_ERROR_THRESHOLD;

/// Lowest concurrency target
pub const MIN_CONCURRENCY: usize = 2;

/// Above this, the scanner is starved for finds and adds a probe
const SPARSE_MS: i64 = 6_000;

/// Below this, discovery is dense enough to drop a probe
const DENSE_MS: i64 = 1_000;

/// Signals consumed by one retarget
#[derive(Debug, Clone, Copy)]
pub struct RetargetSignals {
    pub since_publication_ms: i64,
    pub consecutive_errors: u32,
    /// Valid items in the current (partial) window
    pub current_valid: u32,
    /// Valid items in the prior window, if one has closed yet
    pub previous_valid: Option<u32>,
}

/// Adaptive concurrency target bounded to `[2, ceiling]`
#[derive(Debug, Clone)]
pub struct ConcurrencyController {
    target: usize,
    ceiling: usize,
}

impl ConcurrencyController {
    /// Starts at the ceiling. A ceiling below 2 is raised to 2.
    pub fn new(ceiling: usize) -> Self {
        let ceiling = ceiling.max(MIN_CONCURRENCY);
        Self {
            target: ceiling,
            ceiling,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Recomputes the target
    ///
    /// Rules in order:
    /// 1. Overrun (more than five consecutive not-found): one fewer.
    /// 2. Otherwise, over 6s since publication: one more; under 1s: one fewer.
    /// 3. No valid items in this window nor the prior one: one fewer.
    /// 4. Clamp to `[2, ceiling]`.
    pub fn retarget(&mut self, signals: RetargetSignals) -> usize {
        let mut target = self.target as i64;

        if signals.consecutive_errors > OVERRUN_ERROR_THRESHOLD {
            target -= 1;
        } else if signals.since_publication_ms > SPARSE_MS {
            target += 1;
        } else if signals.since_publication_ms < DENSE_MS {
            target -= 1;
        }

        if signals.current_valid == 0 && signals.previous_valid == Some(0) {
            target -= 1;
        }

        self.target = target.clamp(MIN_CONCURRENCY as i64, self.ceiling as i64) as usize;
        self.target
    }
}
