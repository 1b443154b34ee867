//! Line framing for CR/LF terminated text messages.
//!
//! Message format:
//! - PAYLOAD (0..N-1 bytes): message bytes, no terminator inside
//! - TERMINATOR (2 bytes): carriage return, line feed
//!
//! The assembler is fed one byte at a time from interrupt context and
//! never allocates. An oversized message is dropped whole: the assembler
//! clears itself and skips bytes until the next terminator before it
//! starts collecting again.

use heapless::Vec;

/// End-of-message marker
pub const TERMINATOR: [u8; 2] = *b"\r\n";

/// Errors that can occur when building or encoding lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Payload does not fit the line capacity
    TooLong,
    /// Output buffer too small for encoding
    BufferTooSmall,
}

/// A complete message with the terminator removed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Line<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> Line<N> {
    /// Create a line from raw payload bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LineError> {
        let bytes = Vec::from_slice(bytes).map_err(|_| LineError::TooLong)?;
        Ok(Self { bytes })
    }

    /// Payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload as text, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.bytes).ok()
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check for a bare terminator
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Result of feeding one byte to the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Feed<const N: usize> {
    /// Byte stored, message not finished yet
    Pending,
    /// Terminator seen, message ready
    Complete(Line<N>),
    /// Scratch buffer full without a terminator; message dropped
    Overflow,
    /// Byte skipped while resynchronising after an overflow
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssembleState {
    /// Storing bytes of the current message
    Collecting,
    /// Dropping the tail of an oversized message
    Resync { last_cr: bool },
}

/// Reassembles CR/LF terminated messages from a byte stream
///
/// `N` is the scratch capacity. It bounds the payload plus the carriage
/// return; the line feed that completes a message is never stored.
#[derive(Debug, Clone)]
pub struct LineAssembler<const N: usize> {
    buffer: Vec<u8, N>,
    state: AssembleState,
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineAssembler<N> {
    /// Create an empty assembler
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: AssembleState::Collecting,
        }
    }

    /// Drop any partial message and start collecting afresh
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = AssembleState::Collecting;
    }

    /// Number of bytes of the partial message held so far
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the tail of an oversized message is being skipped
    pub fn is_resyncing(&self) -> bool {
        matches!(self.state, AssembleState::Resync { .. })
    }

    /// Treat a frame boundary as the end of an oversized message
    ///
    /// The receiver calls this at every idle-line event: bytes after the
    /// boundary start a new message even if no terminator followed the
    /// overflow.
    pub fn end_resync(&mut self) {
        if self.is_resyncing() {
            self.state = AssembleState::Collecting;
        }
    }

    /// Feed a single byte to the assembler
    pub fn feed(&mut self, byte: u8) -> Feed<N> {
        match self.state {
            AssembleState::Collecting => {
                if byte == TERMINATOR[1] && self.buffer.last() == Some(&TERMINATOR[0]) {
                    self.buffer.pop();
                    let line = Line {
                        bytes: self.buffer.clone(),
                    };
                    self.buffer.clear();
                    return Feed::Complete(line);
                }

                if self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.state = AssembleState::Resync {
                        last_cr: byte == TERMINATOR[0],
                    };
                    return Feed::Overflow;
                }

                Feed::Pending
            }
            AssembleState::Resync { last_cr } => {
                if last_cr && byte == TERMINATOR[1] {
                    self.state = AssembleState::Collecting;
                } else {
                    self.state = AssembleState::Resync {
                        last_cr: byte == TERMINATOR[0],
                    };
                }
                Feed::Discarded
            }
        }
    }

    /// Feed a run of bytes, reporting every completed line
    ///
    /// Returns the number of lines completed.
    pub fn feed_bytes<F>(&mut self, bytes: &[u8], mut on_line: F) -> usize
    where
        F: FnMut(Line<N>),
    {
        let mut completed = 0;
        for &byte in bytes {
            if let Feed::Complete(line) = self.feed(byte) {
                completed += 1;
                on_line(line);
            }
        }
        completed
    }
}

/// Remove a trailing terminator, if present
pub fn strip_terminator(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(&TERMINATOR).unwrap_or(bytes)
}

/// Encode `payload` as one line into `buffer`
///
/// The terminator is appended unless `payload` already ends with it.
/// Returns the number of bytes written.
pub fn encode_line(payload: &[u8], buffer: &mut [u8]) -> Result<usize, LineError> {
    let body = strip_terminator(payload);
    let len = body.len() + TERMINATOR.len();
    if buffer.len() < len {
        return Err(LineError::BufferTooSmall);
    }

    buffer[..body.len()].copy_from_slice(body);
    buffer[body.len()..len].copy_from_slice(&TERMINATOR);
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<const N: usize>(asm: &mut LineAssembler<N>, bytes: &[u8]) -> Vec<Line<N>, 8> {
        let mut lines = Vec::new();
        asm.feed_bytes(bytes, |line| {
            let _ = lines.push(line);
        });
        lines
    }

    #[test]
    fn test_single_line() {
        let mut asm = LineAssembler::<32>::new();
        let lines = collect(&mut asm, b"PING\r\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_str(), Some("PING"));
        assert_eq!(asm.pending_len(), 0);
    }

    #[test]
    fn test_two_lines_back_to_back() {
        let mut asm = LineAssembler::<32>::new();
        let lines = collect(&mut asm, b"A\r\nB\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].as_bytes(), b"A");
        assert_eq!(lines[1].as_bytes(), b"B");
    }

    #[test]
    fn test_line_split_across_feeds() {
        let mut asm = LineAssembler::<32>::new();
        assert!(collect(&mut asm, b"XY\r").is_empty());
        let lines = collect(&mut asm, b"\nAB");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_bytes(), b"XY");
        assert_eq!(asm.pending_len(), 2);
    }

    #[test]
    fn test_lone_cr_and_lf_are_payload() {
        let mut asm = LineAssembler::<32>::new();
        let lines = collect(&mut asm, b"a\rb\nc\r\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_bytes(), b"a\rb\nc");
    }

    #[test]
    fn test_bare_terminator_is_empty_line() {
        let mut asm = LineAssembler::<8>::new();
        let lines = collect(&mut asm, b"\r\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_empty());
    }

    #[test]
    fn test_overflow_drops_message_and_resyncs() {
        let mut asm = LineAssembler::<8>::new();
        for &b in b"AAAAAAAA" {
            assert_eq!(asm.feed(b), Feed::Pending);
        }
        assert_eq!(asm.feed(b'A'), Feed::Overflow);
        assert!(asm.is_resyncing());
        assert_eq!(asm.pending_len(), 0);

        // Tail of the oversized message is skipped up to its terminator
        let lines = collect(&mut asm, b"AAA\r\nPING\r\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_str(), Some("PING"));
        assert!(!asm.is_resyncing());
    }

    #[test]
    fn test_boundary_ends_resync() {
        let mut asm = LineAssembler::<8>::new();
        assert!(collect(&mut asm, b"ABCDEFGHIJ").is_empty());
        assert!(asm.is_resyncing());

        asm.end_resync();
        assert!(!asm.is_resyncing());
        let lines = collect(&mut asm, b"OK\r\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_bytes(), b"OK");
    }

    #[test]
    fn test_end_resync_keeps_partial_message() {
        let mut asm = LineAssembler::<8>::new();
        collect(&mut asm, b"PA");
        asm.end_resync();
        let lines = collect(&mut asm, b"RT\r\n");
        assert_eq!(lines[0].as_bytes(), b"PART");
    }

    #[test]
    fn test_full_buffer_still_accepts_terminator() {
        // 7 payload bytes + CR fill the scratch exactly; LF is never stored
        let mut asm = LineAssembler::<8>::new();
        let lines = collect(&mut asm, b"1234567\r\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_bytes(), b"1234567");
    }

    #[test]
    fn test_reset_drops_partial() {
        let mut asm = LineAssembler::<16>::new();
        collect(&mut asm, b"garbage");
        asm.reset();
        let lines = collect(&mut asm, b"OK\r\n");
        assert_eq!(lines[0].as_bytes(), b"OK");
    }

    #[test]
    fn test_encode_appends_terminator() {
        let mut buf = [0u8; 8];
        let len = encode_line(b"AT", &mut buf).unwrap();
        assert_eq!(&buf[..len], b"AT\r\n");

        let len = encode_line(b"AT\r\n", &mut buf).unwrap();
        assert_eq!(&buf[..len], b"AT\r\n");
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buf = [0u8; 3];
        assert_eq!(encode_line(b"AT", &mut buf), Err(LineError::BufferTooSmall));
    }

    #[test]
    fn test_line_too_long() {
        assert_eq!(Line::<2>::from_bytes(b"abc"), Err(LineError::TooLong));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_payload_survives_any_split(
                payload in proptest::collection::vec(any::<u8>().prop_filter("no CR", |b| *b != b'\r'), 0..30),
                split in 0usize..34,
            ) {
                let mut wire = std::vec::Vec::from(payload.as_slice());
                wire.extend_from_slice(&TERMINATOR);
                let split = split.min(wire.len());

                let mut asm = LineAssembler::<32>::new();
                let mut lines = std::vec::Vec::new();
                asm.feed_bytes(&wire[..split], |l| lines.push(l));
                asm.feed_bytes(&wire[split..], |l| lines.push(l));

                prop_assert_eq!(lines.len(), 1);
                prop_assert_eq!(lines[0].as_bytes(), payload.as_slice());
            }

            #[test]
            fn prop_never_exceeds_capacity(bytes in proptest::collection::vec(any::<u8>(), 0..200)) {
                let mut asm = LineAssembler::<16>::new();
                for b in bytes {
                    if let Feed::Complete(line) = asm.feed(b) {
                        prop_assert!(line.len() < 16);
                    }
                    prop_assert!(asm.pending_len() <= 16);
                }
            }
        }
    }
}
