//! Tick-driven countdown that can be paused and cancelled.

/// Counts elapsed tick time towards a fixed delay.
///
/// Time only accumulates while the timer is running, so pausing the
/// simulation holds the countdown where it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseableTimer {
    duration_ms: u64,
    elapsed_ms: u64,
    running: bool,
    cancelled: bool,
}

impl PauseableTimer {
    /// A stopped timer for `duration_ms`.
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            elapsed_ms: 0,
            running: false,
            cancelled: false,
        }
    }

    pub fn start(&mut self) {
        if !self.cancelled {
            self.running = true;
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Stop for good. A cancelled timer never fires.
    pub fn cancel(&mut self) {
        self.running = false;
        self.cancelled = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_elapsed(&self) -> bool {
        !self.cancelled && self.elapsed_ms >= self.duration_ms
    }

    pub fn remaining_ms(&self) -> u64 {
        self.duration_ms.saturating_sub(self.elapsed_ms)
    }

    /// Add `interval_ms` if running. True on the tick the delay runs out.
    pub fn tick(&mut self, interval_ms: u64) -> bool {
        if !self.running || self.is_elapsed() {
            return false;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(interval_ms);
        if self.is_elapsed() {
            self.running = false;
            true
        } else {
            false
        }
    }
}
