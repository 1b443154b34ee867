//! Link statistics
//!
//! Every drop path in the pipeline is deliberate and silent. These counters
//! are the only trace it leaves, so the firmware can report them.

use portable_atomic::{AtomicU32, Ordering};

/// Counters updated from both execution contexts
#[derive(Debug, Default)]
pub struct LinkStats {
    bytes_received: AtomicU32,
    bytes_skipped: AtomicU32,
    lines_completed: AtomicU32,
    overflows: AtomicU32,
    mailbox_drops: AtomicU32,
    echoes_suppressed: AtomicU32,
    sends_started: AtomicU32,
    sends_busy: AtomicU32,
    sends_failed: AtomicU32,
    sends_completed: AtomicU32,
    keepalives_skipped: AtomicU32,
    receiver_restarts: AtomicU32,
}

/// Point-in-time copy of [`LinkStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatsSnapshot {
    /// Bytes delivered to the line decoder
    pub bytes_received: u32,
    /// Bytes dropped after the first message of a span
    pub bytes_skipped: u32,
    /// Terminators seen
    pub lines_completed: u32,
    /// Messages dropped for exceeding the assembler capacity
    pub overflows: u32,
    /// Messages dropped because the main loop fell behind
    pub mailbox_drops: u32,
    /// Received messages recognised as our own command
    pub echoes_suppressed: u32,
    /// Transfers started
    pub sends_started: u32,
    /// Sends rejected because a transfer was in flight
    pub sends_busy: u32,
    /// Sends rejected for length or by the peripheral
    pub sends_failed: u32,
    /// Completion notifications for a transfer in flight
    pub sends_completed: u32,
    /// Keep-alive periods skipped on a busy gate
    pub keepalives_skipped: u32,
    /// Receiver restarts after a line fault
    pub receiver_restarts: u32,
}

fn bump(counter: &AtomicU32, by: u32) {
    counter.fetch_add(by, Ordering::Relaxed);
}

fn read(counter: &AtomicU32) -> u32 {
    counter.load(Ordering::Relaxed)
}

impl LinkStats {
    /// Create zeroed counters
    pub const fn new() -> Self {
        Self {
            bytes_received: AtomicU32::new(0),
            bytes_skipped: AtomicU32::new(0),
            lines_completed: AtomicU32::new(0),
            overflows: AtomicU32::new(0),
            mailbox_drops: AtomicU32::new(0),
            echoes_suppressed: AtomicU32::new(0),
            sends_started: AtomicU32::new(0),
            sends_busy: AtomicU32::new(0),
            sends_failed: AtomicU32::new(0),
            sends_completed: AtomicU32::new(0),
            keepalives_skipped: AtomicU32::new(0),
            receiver_restarts: AtomicU32::new(0),
        }
    }

    pub(crate) fn record_drain(&self, delivered: usize, skipped: usize) {
        bump(&self.bytes_received, delivered as u32);
        bump(&self.bytes_skipped, skipped as u32);
    }

    pub(crate) fn record_line(&self) {
        bump(&self.lines_completed, 1);
    }

    pub(crate) fn record_overflow(&self) {
        bump(&self.overflows, 1);
    }

    pub(crate) fn record_mailbox_drop(&self) {
        bump(&self.mailbox_drops, 1);
    }

    pub(crate) fn record_echo(&self) {
        bump(&self.echoes_suppressed, 1);
    }

    pub(crate) fn record_send_started(&self) {
        bump(&self.sends_started, 1);
    }

    pub(crate) fn record_send_busy(&self) {
        bump(&self.sends_busy, 1);
    }

    pub(crate) fn record_send_failed(&self) {
        bump(&self.sends_failed, 1);
    }

    pub(crate) fn record_send_completed(&self) {
        bump(&self.sends_completed, 1);
    }

    pub(crate) fn record_keepalive_skipped(&self) {
        bump(&self.keepalives_skipped, 1);
    }

    pub(crate) fn record_receiver_restart(&self) {
        bump(&self.receiver_restarts, 1);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_received: read(&self.bytes_received),
            bytes_skipped: read(&self.bytes_skipped),
            lines_completed: read(&self.lines_completed),
            overflows: read(&self.overflows),
            mailbox_drops: read(&self.mailbox_drops),
            echoes_suppressed: read(&self.echoes_suppressed),
            sends_started: read(&self.sends_started),
            sends_busy: read(&self.sends_busy),
            sends_failed: read(&self.sends_failed),
            sends_completed: read(&self.sends_completed),
            keepalives_skipped: read(&self.keepalives_skipped),
            receiver_restarts: read(&self.receiver_restarts),
        }
    }
}
