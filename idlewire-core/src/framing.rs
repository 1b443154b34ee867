//! Frame boundary detection
//!
//! Runs in the idle-line interrupt. Each call reads where the engine is
//! writing, hands every byte since the previous call to a sink in arrival
//! order, and moves the consumed cursor up to the write position.

use idlewire_hal::CircularRx;
use portable_atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ring::Span;

/// How much of the pending data one drain delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FramingPolicy {
    /// Everything received since the last drain
    #[default]
    IdleLine,
    /// Whole chunks of this many bytes; a partial chunk waits for the next drain
    ///
    /// `FixedLength(1)` is byte-at-a-time reception.
    FixedLength(u16),
}

/// What happens to the rest of a span after a message completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScanPolicy {
    /// Keep decoding; every terminator in the span yields a message
    #[default]
    Continue,
    /// Drop the remainder of the span after the first message
    StopAtFirst,
}

/// Sink verdict after each delivered byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flow {
    /// Deliver the next byte
    Continue,
    /// Skip the rest of this span
    Stop,
}

/// Outcome of one drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Drain {
    /// Bytes handed to the sink
    pub delivered: usize,
    /// Bytes consumed without delivery after the sink asked to stop
    pub skipped: usize,
}

/// Idle-line frame boundary detector
///
/// Owns the consumed cursor. Only the interrupt context calls
/// [`drain`](Self::drain); the main loop may read the cursor but never
/// moves it.
#[derive(Debug)]
pub struct FrameDetector {
    consumed: AtomicUsize,
    policy: FramingPolicy,
}

impl FrameDetector {
    /// Create a detector with the cursor at index 0
    pub const fn new(policy: FramingPolicy) -> Self {
        Self {
            consumed: AtomicUsize::new(0),
            policy,
        }
    }

    /// Active framing policy
    pub fn policy(&self) -> FramingPolicy {
        self.policy
    }

    /// Index of the next byte to deliver
    pub fn consumed(&self) -> usize {
        self.consumed.load(Ordering::Acquire)
    }

    /// Bytes the next drain would deliver
    pub fn pending<R: CircularRx + ?Sized>(&self, rx: &R) -> Span {
        let span = Span::between(self.consumed(), rx.write_position(), rx.capacity());
        match self.policy {
            FramingPolicy::IdleLine | FramingPolicy::FixedLength(0) => span,
            FramingPolicy::FixedLength(chunk) => {
                let chunk = usize::from(chunk);
                span.truncate(span.len() / chunk * chunk)
            }
        }
    }

    /// Deliver pending bytes to `sink` and advance the cursor past them
    ///
    /// The write position is sampled once; bytes landing during the drain
    /// belong to the next call. If the sink returns [`Flow::Stop`] the rest
    /// of the span is consumed without delivery.
    pub fn drain<R, F>(&self, rx: &R, mut sink: F) -> Drain
    where
        R: CircularRx + ?Sized,
        F: FnMut(u8) -> Flow,
    {
        let span = self.pending(rx);
        let (head, tail) = span.parts();
        let mut delivered = 0;

        'span: for range in [head, tail] {
            for index in range {
                delivered += 1;
                if sink(rx.byte_at(index)) == Flow::Stop {
                    break 'span;
                }
            }
        }

        self.consumed.store(span.end(), Ordering::Release);
        Drain {
            delivered,
            skipped: span.len() - delivered,
        }
    }

    /// Jump the cursor to the current write position
    ///
    /// Used after a receiver restart. Returns the number of bytes dropped.
    pub fn resync<R: CircularRx + ?Sized>(&self, rx: &R) -> usize {
        let write_pos = rx.write_position();
        let span = Span::between(self.consumed(), write_pos, rx.capacity());
        self.consumed.store(span.end(), Ordering::Release);
        span.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::SoftRing;
    use std::vec::Vec;

    fn drain_all<const N: usize>(det: &FrameDetector, ring: &SoftRing<N>) -> Vec<u8> {
        let mut out = Vec::new();
        det.drain(ring, |b| {
            out.push(b);
            Flow::Continue
        });
        out
    }

    #[test]
    fn test_nothing_new_is_empty_drain() {
        let ring = SoftRing::<8>::new();
        ring.start();
        let det = FrameDetector::new(FramingPolicy::IdleLine);
        let result = det.drain(&ring, |_| Flow::Continue);
        assert_eq!(result, Drain::default());
        assert_eq!(det.consumed(), 0);
    }

    #[test]
    fn test_drain_advances_to_write_position() {
        let ring = SoftRing::<8>::new();
        ring.start();
        let det = FrameDetector::new(FramingPolicy::IdleLine);

        ring.push_slice(b"abc");
        assert_eq!(drain_all(&det, &ring), b"abc");
        assert_eq!(det.consumed(), 3);

        ring.push_slice(b"de");
        assert_eq!(drain_all(&det, &ring), b"de");
        assert_eq!(det.consumed(), 5);
    }

    #[test]
    fn test_drain_across_wrap_in_order() {
        let ring = SoftRing::<8>::new();
        ring.start();
        let det = FrameDetector::new(FramingPolicy::IdleLine);

        ring.push_slice(b"012345");
        drain_all(&det, &ring);

        ring.push_slice(b"XY\r\nAB");
        assert_eq!(drain_all(&det, &ring), b"XY\r\nAB");
        assert_eq!(det.consumed(), 4);
    }

    #[test]
    fn test_stop_consumes_rest_of_span() {
        let ring = SoftRing::<16>::new();
        ring.start();
        let det = FrameDetector::new(FramingPolicy::IdleLine);

        ring.push_slice(b"abcdef");
        let mut seen = Vec::new();
        let result = det.drain(&ring, |b| {
            seen.push(b);
            if b == b'b' {
                Flow::Stop
            } else {
                Flow::Continue
            }
        });

        assert_eq!(seen, b"ab");
        assert_eq!(result.delivered, 2);
        assert_eq!(result.skipped, 4);
        assert_eq!(det.consumed(), 6);
    }

    #[test]
    fn test_fixed_length_waits_for_whole_chunks() {
        let ring = SoftRing::<16>::new();
        ring.start();
        let det = FrameDetector::new(FramingPolicy::FixedLength(4));

        ring.push_slice(b"abcdef");
        assert_eq!(drain_all(&det, &ring), b"abcd");
        assert_eq!(det.consumed(), 4);

        ring.push_slice(b"gh");
        assert_eq!(drain_all(&det, &ring), b"efgh");
    }

    #[test]
    fn test_fixed_length_one_is_byte_at_a_time() {
        let ring = SoftRing::<4>::new();
        ring.start();
        let det = FrameDetector::new(FramingPolicy::FixedLength(1));

        for &b in b"hello" {
            ring.push(b);
            assert_eq!(drain_all(&det, &ring), [b]);
        }
    }

    #[test]
    fn test_resync_drops_pending() {
        let ring = SoftRing::<8>::new();
        ring.start();
        let det = FrameDetector::new(FramingPolicy::IdleLine);

        ring.push_slice(b"noise");
        assert_eq!(det.resync(&ring), 5);
        assert!(det.pending(&ring).is_empty());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Bytes come out in order, exactly once, whenever fewer than a
            /// full buffer arrive between idle events.
            #[test]
            fn prop_ordered_exactly_once(
                bursts in proptest::collection::vec(
                    proptest::collection::vec(any::<u8>(), 0..16),
                    1..20,
                ),
            ) {
                let ring = SoftRing::<16>::new();
                ring.start();
                let det = FrameDetector::new(FramingPolicy::IdleLine);

                let mut sent = Vec::new();
                let mut received = Vec::new();
                for burst in &bursts {
                    // written - consumed stays below capacity
                    let burst = &burst[..burst.len().min(15)];
                    ring.push_slice(burst);
                    sent.extend_from_slice(burst);
                    det.drain(&ring, |b| {
                        received.push(b);
                        Flow::Continue
                    });
                }

                prop_assert_eq!(sent, received);
            }
        }
    }
}
