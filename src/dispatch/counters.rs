//! Run counters owned by the dispatch loop
//!
//! All mutation happens on the loop's single consumer turn, so these are
//! plain integers rather than atomics.

use std::time::Duration;
use tokio::time::Instant;

/// Monotonically non-decreasing request counters plus the run start time
///
/// The start timestamp is captured once, at pool-construction time.
#[derive(Debug, Clone)]
pub struct RunCounters {
    issued: u64,
    succeeded: u64,
    failed: u64,
    started_at: Instant,
}

impl RunCounters {
    pub fn new() -> Self {
        Self {
            issued: 0,
            succeeded: 0,
            failed: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_issued(&mut self) {
        self.issued += 1;
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_error(&mut self) {
        self.failed += 1;
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Completed responses, successful or not
    pub fn responses(&self) -> u64 {
        self.succeeded + self.failed
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RunCounters {
    fn default() -> Self {
        Self::new()
    }
}
