//! Command correlation
//!
//! Devices that echo their input (and boards with TX looped back to RX)
//! send every outbound command straight back. The correlator remembers the
//! last command issued and recognises that echo so it is not reported as
//! new input.

use heapless::Vec;
use idlewire_protocol::strip_terminator;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rule for deciding that a received message is our own command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EchoPolicy {
    /// Message equals the command text
    #[default]
    Exact,
    /// Message contains the command text anywhere
    Contains,
    /// Never suppress anything
    Disabled,
}

/// Verdict for one received message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Correlation {
    /// Our own command coming back; discard
    Echo,
    /// Genuine input from the attached device
    External,
}

/// Last command sent, with its terminator stripped
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingCommand<const N: usize> {
    text: Vec<u8, N>,
    issued_at_ms: u32,
}

impl<const N: usize> PendingCommand<N> {
    /// Record `command` issued at `now_ms`
    ///
    /// Returns `None` if the command does not fit.
    pub fn new(command: &[u8], now_ms: u32) -> Option<Self> {
        let text = Vec::from_slice(strip_terminator(command)).ok()?;
        Some(Self {
            text,
            issued_at_ms: now_ms,
        })
    }

    /// Command text without terminator
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// Tick at which the command was issued
    pub fn issued_at_ms(&self) -> u32 {
        self.issued_at_ms
    }

    /// Milliseconds since the command was issued (wrapping tick)
    pub fn age_ms(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.issued_at_ms)
    }
}

/// Matches received messages against the last outbound command
#[derive(Debug, Clone)]
pub struct CommandCorrelator<const N: usize> {
    policy: EchoPolicy,
    pending: Option<PendingCommand<N>>,
}

impl<const N: usize> CommandCorrelator<N> {
    /// Create a correlator with nothing pending
    pub const fn new(policy: EchoPolicy) -> Self {
        Self {
            policy,
            pending: None,
        }
    }

    /// Active echo policy
    pub fn policy(&self) -> EchoPolicy {
        self.policy
    }

    /// Remember `command` as the most recent outbound command
    ///
    /// Overwrites any previous record. A command too long to remember
    /// clears the record and returns `false`.
    pub fn record(&mut self, command: &[u8], now_ms: u32) -> bool {
        self.pending = PendingCommand::new(command, now_ms);
        self.pending.is_some()
    }

    /// Forget the pending command
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Most recent outbound command, if not yet echoed
    pub fn pending(&self) -> Option<&PendingCommand<N>> {
        self.pending.as_ref()
    }

    /// Classify a received message
    ///
    /// A match consumes the pending record, so the same command is
    /// suppressed at most once.
    pub fn correlate(&mut self, message: &[u8]) -> Correlation {
        let Some(pending) = &self.pending else {
            return Correlation::External;
        };
        let command = pending.text();
        if command.is_empty() {
            return Correlation::External;
        }

        let echoed = match self.policy {
            EchoPolicy::Exact => message == command,
            EchoPolicy::Contains => message.windows(command.len()).any(|w| w == command),
            EchoPolicy::Disabled => false,
        };

        if echoed {
            self.pending = None;
            Correlation::Echo
        } else {
            Correlation::External
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_pending_is_external() {
        let mut corr = CommandCorrelator::<32>::new(EchoPolicy::Exact);
        assert_eq!(corr.correlate(b"AT"), Correlation::External);
    }

    #[test]
    fn test_exact_echo_suppressed_once() {
        let mut corr = CommandCorrelator::<32>::new(EchoPolicy::Exact);
        assert!(corr.record(b"AT\r\n", 100));
        assert_eq!(corr.pending().unwrap().text(), b"AT");

        assert_eq!(corr.correlate(b"AT"), Correlation::Echo);
        assert!(corr.pending().is_none());
        assert_eq!(corr.correlate(b"AT"), Correlation::External);
    }

    #[test]
    fn test_reply_is_external() {
        let mut corr = CommandCorrelator::<32>::new(EchoPolicy::Exact);
        corr.record(b"AT", 0);
        assert_eq!(corr.correlate(b"OK"), Correlation::External);
        // Reply does not consume the record
        assert!(corr.pending().is_some());
    }

    #[test]
    fn test_exact_ignores_superset() {
        let mut corr = CommandCorrelator::<32>::new(EchoPolicy::Exact);
        corr.record(b"AT", 0);
        assert_eq!(corr.correlate(b"> AT"), Correlation::External);
    }

    #[test]
    fn test_contains_matches_superset() {
        let mut corr = CommandCorrelator::<32>::new(EchoPolicy::Contains);
        corr.record(b"AT+CSQ", 0);
        assert_eq!(corr.correlate(b"> AT+CSQ"), Correlation::Echo);
    }

    #[test]
    fn test_disabled_never_suppresses() {
        let mut corr = CommandCorrelator::<32>::new(EchoPolicy::Disabled);
        corr.record(b"AT", 0);
        assert_eq!(corr.correlate(b"AT"), Correlation::External);
    }

    #[test]
    fn test_newer_command_overwrites() {
        let mut corr = CommandCorrelator::<32>::new(EchoPolicy::Exact);
        corr.record(b"AT", 0);
        corr.record(b"ATI", 5);
        assert_eq!(corr.correlate(b"AT"), Correlation::External);
        assert_eq!(corr.correlate(b"ATI"), Correlation::Echo);
    }

    #[test]
    fn test_oversized_command_clears_record() {
        let mut corr = CommandCorrelator::<4>::new(EchoPolicy::Exact);
        corr.record(b"AT", 0);
        assert!(!corr.record(b"AT+TOOLONG", 1));
        assert!(corr.pending().is_none());
    }

    #[test]
    fn test_age_wraps() {
        let pending = PendingCommand::<8>::new(b"AT", u32::MAX - 9).unwrap();
        assert_eq!(pending.age_ms(10), 20);
    }
}
