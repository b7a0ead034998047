//! Step controller
//!
//! Decides how far the frontier moves per launched fetch. The longer it has been
//! since the last real publication, the further ahead the scanner jumps; when it
//! is close to (or past) the live frontier it backs off one ID at a time.
//!
//! | Since publication | Next step |
//! |-------------------|-----------|
//! | > 20000ms | min(step * 2 + 10, 50) |
//! | > 10000ms | min(step * 2 + 1, 10) |
//! | > 6500ms  | min(step * 2, 3) |
//! | > 4000ms  | min(step + 1, 2) |
//! | > 2000ms  | 1 |
//! | otherwise | -1 |
//!
//! More than five consecutive not-found outcomes force -1 regardless of time.

/// Largest forward step
pub const MAX_STEP: i64 = 50;

/// Largest backward step
pub const MIN_STEP: i64 = -1;

/// Consecutive not-found outcomes beyond which the frontier is assumed overrun
pub const OVERRUN_ERROR_THRESHOLD: u32 = 5;

/// Adaptive step size
#[derive(Debug, Clone)]
pub struct StepController {
    step: i64,
}

impl StepController {
    pub fn new() -> Self {
        Self { step: 1 }
    }

    /// The most recently computed step
    pub fn current(&self) -> i64 {
        self.step
    }

    /// Computes and stores the next step
    ///
    /// # Arguments
    ///
    /// * `since_publication_ms` - Time since the publication clock
    /// * `consecutive_errors` - Not-found outcomes since the last found item
    pub fn next_step(&mut self, since_publication_ms: i64, consecutive_errors: u32) -> i64 {
        // Acceleration tiers scale the prior step; a backtracking prior restarts from 1
        let prior = self.step.max(1);

        let step = match since_publication_ms {
            t if t > 20_000 => (prior * 2 + 10).min(50),
            t if t > 10_000 => (prior * 2 + 1).min(10),
            t if t > 6_500 => (prior * 2).min(3),
            t if t > 4_000 => (prior + 1).min(2),
            t if t > 2_000 => 1,
            _ => -1,
        };

        let step = if consecutive_errors > OVERRUN_ERROR_THRESHOLD {
            -1
        } else {
            step
        };

        self.step = step.clamp(MIN_STEP, MAX_STEP);
        self.step
    }
}

impl Default for StepController {
    fn default() -> Self {
        Self::new()
    }
}
