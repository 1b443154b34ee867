//! Keep-alive scheduling
//!
//! Checked from the cooperative main loop with the platform millisecond
//! tick. The tick is a wrapping `u32`, so all comparisons use wrapping
//! subtraction.

use portable_atomic::{AtomicU32, Ordering};

/// Fires at most once per interval
///
/// The first period starts at tick 0. Claiming a due period restarts the
/// interval whether or not the send that follows succeeds, so a period
/// that finds the transmitter busy is skipped rather than retried.
#[derive(Debug)]
pub struct KeepAliveTimer {
    interval_ms: u32,
    last_ms: AtomicU32,
}

impl KeepAliveTimer {
    /// Create a timer with the given interval
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: AtomicU32::new(0),
        }
    }

    /// Configured interval
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Check whether a period has elapsed at `now_ms`
    pub fn is_due(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_ms.load(Ordering::Acquire)) >= self.interval_ms
    }

    /// Claim the current period if it is due
    pub fn claim(&self, now_ms: u32) -> bool {
        if !self.is_due(now_ms) {
            return false;
        }
        self.last_ms.store(now_ms, Ordering::Release);
        true
    }

    /// Milliseconds until the next period is due
    pub fn remaining_ms(&self, now_ms: u32) -> u32 {
        let elapsed = now_ms.wrapping_sub(self.last_ms.load(Ordering::Acquire));
        self.interval_ms.saturating_sub(elapsed)
    }
}
