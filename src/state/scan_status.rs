use crate::state::ScanPhase;

/// Snapshot of the scheduler, published by the scan loop on every iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStatus {
    pub phase: ScanPhase,

    /// Last probed identifier (0 until bootstrap completes)
    pub frontier: u64,

    /// Most recently computed step
    pub step: i64,

    pub concurrency_target: usize,
    pub in_flight: usize,
    pub consecutive_errors: u32,

    /// Highest ID that produced a found outcome
    pub highest_found: u64,

    /// Items handed to the callback since start
    pub items_delivered: u64,

    /// Number of 3-second rate-limit pauses taken
    pub rate_limit_pauses: u64,
}
