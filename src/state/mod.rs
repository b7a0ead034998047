//! State module for tracking scan progress
//!
//! # Components
//!
//! - `ScanPhase`: where the scan loop is in its lifecycle
//! - `ScanStatus`: a snapshot of scheduler state published by the scan loop

mod scan_phase;
mod scan_status;

pub use scan_phase::ScanPhase;
pub use scan_status::ScanStatus;
