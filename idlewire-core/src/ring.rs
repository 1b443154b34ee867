//! Receive ring buffer
//!
//! The storage itself belongs to whoever fills it: a DMA engine on target,
//! or [`SoftRing`] when bytes arrive one interrupt at a time. This module
//! provides the cursor arithmetic shared by both.

use core::convert::Infallible;
use core::ops::Range;

use idlewire_hal::CircularRx;
use portable_atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Region of the ring between two cursors
///
/// A span that runs past the end of the buffer is split into two
/// contiguous parts: the tail of the buffer, then its head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Span {
    start: usize,
    len: usize,
    capacity: usize,
}

impl Span {
    /// Span covering `[consumed, write_pos)` modulo `capacity`
    pub fn between(consumed: usize, write_pos: usize, capacity: usize) -> Self {
        if capacity == 0 {
            return Self {
                start: 0,
                len: 0,
                capacity,
            };
        }
        let start = consumed % capacity;
        let end = write_pos % capacity;
        Self {
            start,
            len: (end + capacity - start) % capacity,
            capacity,
        }
    }

    /// First index of the span
    pub fn start(&self) -> usize {
        self.start
    }

    /// Index just past the span, wrapped into the buffer
    pub fn end(&self) -> usize {
        if self.capacity == 0 {
            0
        } else {
            (self.start + self.len) % self.capacity
        }
    }

    /// Number of bytes covered
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the span covers no bytes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the span crosses the end of the buffer
    pub fn is_wrapped(&self) -> bool {
        self.start + self.len > self.capacity
    }

    /// Keep only the first `len` bytes
    pub fn truncate(self, len: usize) -> Self {
        Self {
            len: self.len.min(len),
            ..self
        }
    }

    /// The span as at most two contiguous index ranges, in arrival order
    pub fn parts(&self) -> (Range<usize>, Range<usize>) {
        let first_end = (self.start + self.len).min(self.capacity);
        let second_len = self.len - (first_end - self.start);
        (self.start..first_end, 0..second_len)
    }
}

/// Ring filled by software, one byte per call
///
/// Models the byte-at-a-time interrupt receiver: the RX-complete handler
/// pushes each byte as it lands. Implements [`CircularRx`] so the same
/// frame detector drains it. Like the DMA engine it never refuses a byte;
/// a slow consumer loses the oldest unread data.
pub struct SoftRing<const N: usize> {
    storage: [AtomicU8; N],
    written: AtomicUsize,
    running: AtomicBool,
}

impl<const N: usize> Default for SoftRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SoftRing<N> {
    /// Create an empty, stopped ring
    pub const fn new() -> Self {
        Self {
            storage: [const { AtomicU8::new(0) }; N],
            written: AtomicUsize::new(0),
            running: AtomicBool::new(false),
        }
    }

    /// Start accepting bytes
    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Check if the ring accepts bytes
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Store one received byte
    ///
    /// Returns `false` if the ring has not been started.
    pub fn push(&self, byte: u8) -> bool {
        if N == 0 || !self.is_running() {
            return false;
        }
        let written = self.written.load(Ordering::Relaxed);
        self.storage[written].store(byte, Ordering::Relaxed);
        self.written.store((written + 1) % N, Ordering::Release);
        true
    }

    /// Store a run of received bytes
    pub fn push_slice(&self, bytes: &[u8]) -> usize {
        bytes.iter().take_while(|&&b| self.push(b)).count()
    }

    /// Index the next byte lands at, always below `N`
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }
}

impl<const N: usize> CircularRx for SoftRing<N> {
    type Error = Infallible;

    fn start_continuous_receive(&mut self) -> Result<(), Self::Error> {
        self.start();
        Ok(())
    }

    fn capacity(&self) -> usize {
        N
    }

    fn remaining_count(&self) -> usize {
        if N == 0 {
            return 0;
        }
        N - self.written()
    }

    fn byte_at(&self, index: usize) -> u8 {
        self.storage[index % N].load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_contiguous() {
        let span = Span::between(2, 6, 8);
        assert_eq!(span.len(), 4);
        assert!(!span.is_wrapped());
        assert_eq!(span.parts(), (2..6, 0..0));
        assert_eq!(span.end(), 6);
    }

    #[test]
    fn test_span_wrapped() {
        let span = Span::between(6, 2, 8);
        assert_eq!(span.len(), 4);
        assert!(span.is_wrapped());
        assert_eq!(span.parts(), (6..8, 0..2));
        assert_eq!(span.end(), 2);
    }

    #[test]
    fn test_span_ends_exactly_at_buffer_end() {
        let span = Span::between(5, 0, 8);
        assert_eq!(span.len(), 3);
        assert!(!span.is_wrapped());
        assert_eq!(span.parts(), (5..8, 0..0));
        assert_eq!(span.end(), 0);
    }

    #[test]
    fn test_span_empty_when_cursors_meet() {
        let span = Span::between(3, 3, 8);
        assert!(span.is_empty());
        assert_eq!(span.parts(), (3..3, 0..0));
    }

    #[test]
    fn test_span_truncate() {
        let span = Span::between(6, 4, 8).truncate(3);
        assert_eq!(span.len(), 3);
        assert_eq!(span.parts(), (6..8, 0..1));
        assert_eq!(span.end(), 1);
    }

    #[test]
    fn test_soft_ring_ignores_bytes_before_start() {
        let ring = SoftRing::<8>::new();
        assert!(!ring.push(b'x'));
        assert_eq!(ring.written(), 0);
        ring.start();
        assert!(ring.push(b'x'));
        assert_eq!(ring.byte_at(0), b'x');
    }

    #[test]
    fn test_soft_ring_counts_down_like_dma() {
        let ring = SoftRing::<8>::new();
        ring.start();
        assert_eq!(ring.remaining_count(), 8);
        assert_eq!(ring.write_position(), 0);

        ring.push_slice(b"abcde");
        assert_eq!(ring.remaining_count(), 3);
        assert_eq!(ring.write_position(), 5);

        ring.push_slice(b"fgh");
        // Wrapped: counter reloaded
        assert_eq!(ring.remaining_count(), 8);
        assert_eq!(ring.write_position(), 0);
    }

    #[test]
    fn test_soft_ring_overwrites_oldest() {
        let ring = SoftRing::<4>::new();
        ring.start();
        ring.push_slice(b"abcdef");
        assert_eq!(ring.byte_at(0), b'e');
        assert_eq!(ring.byte_at(1), b'f');
        assert_eq!(ring.byte_at(2), b'c');
    }

    #[test]
    fn test_soft_ring_odd_capacity_stays_in_range() {
        let ring = SoftRing::<3>::new();
        ring.start();
        ring.push_slice(b"0123456789");

        assert_eq!(ring.written(), 1);
        assert_eq!(ring.remaining_count(), 2);
        assert_eq!(ring.write_position(), 1);
        assert_eq!(ring.byte_at(0), b'9');
        assert_eq!(ring.byte_at(1), b'7');
        assert_eq!(ring.byte_at(2), b'8');
    }
}
