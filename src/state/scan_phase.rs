use std::fmt;

/// Scan loop lifecycle phase
///
/// The loop only ever moves forward: `Bootstrapping` → `Scanning` → `Stopped`.
/// `Stopped` is reached only through shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanPhase {
    /// Looking for the newest item ID in the catalog listing
    #[default]
    Bootstrapping,

    /// Walking the identifier space forward
    Scanning,

    /// Shut down
    Stopped,
}

impl ScanPhase {
    /// Returns true while the loop is still running
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Stopped)
    }

    /// Checks whether moving to `next` is allowed
    pub fn can_transition_to(&self, next: ScanPhase) -> bool {
        matches!(
            (self, next),
            (Self::Bootstrapping, Self::Scanning)
                | (Self::Bootstrapping, Self::Stopped)
                | (Self::Scanning, Self::Stopped)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bootstrapping => "bootstrapping",
            Self::Scanning => "scanning",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
