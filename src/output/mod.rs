//! Output module for journaling found items and reporting on them
//!
//! This module handles:
//! - Forwarding found items from the scanner callback to the item journal
//! - Loading and printing journal statistics

mod journal;
pub mod stats;

pub use journal::{spawn_journal_writer, JournalSender};
pub use stats::{load_statistics, print_statistics, ScanStatistics};
