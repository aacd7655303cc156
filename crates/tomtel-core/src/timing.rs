//! Watchdog bookkeeping for a single run.

use std::time::Instant;

use crate::Watchdog;

/// Running watchdog started at the beginning of a run.
#[derive(Debug, Clone, Copy)]
pub struct WatchdogTimer {
    watchdog: Watchdog,
    started: Instant,
}

impl WatchdogTimer {
    /// Starts the clock for `watchdog`.
    #[must_use]
    pub fn start(watchdog: Watchdog) -> Self {
        Self {
            watchdog,
            started: Instant::now(),
        }
    }

    /// Returns `true` once the bound is exceeded after `retired` instructions.
    #[must_use]
    pub fn expired(&self, retired: u64) -> bool {
        match self.watchdog {
            Watchdog::WallClock(limit) => self.started.elapsed() > limit,
            Watchdog::InstructionBudget(budget) => retired >= budget,
            Watchdog::Unbounded => false,
        }
    }
}
