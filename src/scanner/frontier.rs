//! Probe frontier

/// The next identifier worth probing
///
/// The position moves by the signed step, but never to or below the floor: the
/// highest identifier already confirmed to exist (from bootstrap or a found
/// outcome). Confirmed identifiers are never probed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frontier {
    position: u64,
    floor: u64,
}

impl Frontier {
    /// Starts at a confirmed identifier
    pub fn new(confirmed: u64) -> Self {
        Self {
            position: confirmed,
            floor: confirmed,
        }
    }

    /// Last probed (or starting) identifier
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Highest confirmed identifier
    pub fn floor(&self) -> u64 {
        self.floor
    }

    /// Records a confirmed identifier; older ones are ignored
    pub fn raise_floor(&mut self, confirmed: u64) {
        self.floor = self.floor.max(confirmed);
    }

    /// Applies `step` and returns the identifier to probe
    pub fn advance(&mut self, step: i64) -> u64 {
        let lowest = self.floor.saturating_add(1);
        self.position = self.position.saturating_add_signed(step).max(lowest);
        self.position
    }
}
