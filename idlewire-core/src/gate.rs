//! Transmit gate
//!
//! At most one outbound transfer is in flight. The flag is claimed before
//! the transfer starts and released only by the completion notification
//! (or by the failed start itself). A send that finds the gate closed is
//! rejected on the spot; nothing is queued.

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use heapless::Vec;
use idlewire_hal::{DmaTx, TransferError};
use portable_atomic::{AtomicBool, Ordering};

/// Why a send did not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError<E> {
    /// A transfer is already in flight
    Busy,
    /// Data does not fit the transmit buffer
    TooLong,
    /// The peripheral refused to start
    Peripheral(E),
}

impl<E> From<TransferError<E>> for SendError<E> {
    fn from(e: TransferError<E>) -> Self {
        match e {
            TransferError::Busy => SendError::Busy,
            TransferError::Peripheral(e) => SendError::Peripheral(e),
        }
    }
}

/// Single-in-flight transmit gate with its own transmit buffer
///
/// The buffer must outlive the transfer, so the gate owns it and never
/// touches it while the in-flight flag is set.
pub struct TxGate<const N: usize> {
    in_flight: AtomicBool,
    buffer: CriticalSectionMutex<RefCell<Vec<u8, N>>>,
}

impl<const N: usize> Default for TxGate<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TxGate<N> {
    /// Create an idle gate
    pub const fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            buffer: CriticalSectionMutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Check if a transfer is in flight
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Send a copy of `data`
    ///
    /// Empty data is accepted without starting a transfer.
    pub fn try_send<T: DmaTx>(&self, tx: &mut T, data: &[u8]) -> Result<(), SendError<T::Error>> {
        if data.len() > N {
            return Err(SendError::TooLong);
        }
        self.try_send_with(tx, |buf| buf.extend_from_slice(data).map_err(|_| ()))
    }

    /// Send formatted text
    pub fn try_send_fmt<T: DmaTx>(
        &self,
        tx: &mut T,
        args: fmt::Arguments<'_>,
    ) -> Result<(), SendError<T::Error>> {
        self.try_send_with(tx, |buf| {
            fmt::write(&mut BufWriter(buf), args).map_err(|_| ())
        })
    }

    /// Claim the gate, let `fill` build the outbound bytes, start the transfer
    ///
    /// `fill` runs only once the gate is claimed and receives an empty
    /// buffer. If it fails, or leaves the buffer empty, the gate is
    /// released again.
    pub fn try_send_with<T, F>(&self, tx: &mut T, fill: F) -> Result<(), SendError<T::Error>>
    where
        T: DmaTx,
        F: FnOnce(&mut Vec<u8, N>) -> Result<(), ()>,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SendError::Busy);
        }

        let result = self.buffer.lock(|cell| {
            let mut buf = cell.borrow_mut();
            buf.clear();
            fill(&mut buf).map_err(|_| SendError::TooLong)?;
            if buf.is_empty() {
                return Ok(false);
            }
            tx.begin_transfer(&buf[..])?;
            Ok(true)
        });

        match result {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.in_flight.store(false, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                self.in_flight.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Completion notification for the transfer in flight
    ///
    /// Returns `false` if no transfer was in flight.
    pub fn complete(&self) -> bool {
        self.in_flight.swap(false, Ordering::AcqRel)
    }

    /// Inspect the bytes of the transfer in flight
    pub fn with_in_flight<R>(&self, f: impl FnOnce(Option<&[u8]>) -> R) -> R {
        self.buffer.lock(|cell| {
            let buf = cell.borrow();
            if self.is_busy() {
                f(Some(&buf[..]))
            } else {
                f(None)
            }
        })
    }
}

struct BufWriter<'a, const N: usize>(&'a mut Vec<u8, N>);

impl<const N: usize> fmt::Write for BufWriter<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTx;

    #[test]
    fn test_send_starts_transfer() {
        let gate = TxGate::<16>::new();
        let mut tx = MockTx::new();

        assert_eq!(gate.try_send(&mut tx, b"AT\r\n"), Ok(()));
        assert!(gate.is_busy());
        assert_eq!(tx.transfers(), [b"AT\r\n".to_vec()]);
    }

    #[test]
    fn test_second_send_is_busy() {
        let gate = TxGate::<16>::new();
        let mut tx = MockTx::new();

        gate.try_send(&mut tx, b"first").unwrap();
        assert_eq!(gate.try_send(&mut tx, b"second"), Err(SendError::Busy));

        // In-flight buffer untouched, nothing new started
        gate.with_in_flight(|bytes| assert_eq!(bytes, Some(&b"first"[..])));
        assert_eq!(tx.transfers().len(), 1);
    }

    #[test]
    fn test_completion_reopens_gate() {
        let gate = TxGate::<16>::new();
        let mut tx = MockTx::new();

        gate.try_send(&mut tx, b"first").unwrap();
        assert!(gate.complete());
        tx.finish();
        assert!(!gate.is_busy());

        assert_eq!(gate.try_send(&mut tx, b"second"), Ok(()));
        assert_eq!(tx.transfers().len(), 2);
    }

    #[test]
    fn test_spurious_completion_ignored() {
        let gate = TxGate::<16>::new();
        assert!(!gate.complete());
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_too_long_leaves_gate_open() {
        let gate = TxGate::<4>::new();
        let mut tx = MockTx::new();

        assert_eq!(gate.try_send(&mut tx, b"toolong"), Err(SendError::TooLong));
        assert!(!gate.is_busy());
        assert!(tx.transfers().is_empty());
    }

    #[test]
    fn test_peripheral_error_releases_gate() {
        let gate = TxGate::<16>::new();
        let mut tx = MockTx::new();
        tx.fail_next();

        assert_eq!(
            gate.try_send(&mut tx, b"AT"),
            Err(SendError::Peripheral(crate::testing::MockTxError))
        );
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_hardware_busy_reported_as_busy() {
        let gate = TxGate::<16>::new();
        let mut tx = MockTx::new();
        tx.begin_transfer(b"external").unwrap();

        assert_eq!(gate.try_send(&mut tx, b"AT"), Err(SendError::Busy));
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_empty_send_is_noop() {
        let gate = TxGate::<16>::new();
        let mut tx = MockTx::new();

        assert_eq!(gate.try_send(&mut tx, b""), Ok(()));
        assert!(!gate.is_busy());
        assert!(tx.transfers().is_empty());
    }

    #[test]
    fn test_formatted_send() {
        let gate = TxGate::<32>::new();
        let mut tx = MockTx::new();

        gate.try_send_fmt(&mut tx, format_args!("\r\n[RX] {}\r\n", "OK"))
            .unwrap();
        assert_eq!(tx.transfers(), [b"\r\n[RX] OK\r\n".to_vec()]);
    }

    #[test]
    fn test_formatted_overflow_is_too_long() {
        let gate = TxGate::<4>::new();
        let mut tx = MockTx::new();

        assert_eq!(
            gate.try_send_fmt(&mut tx, format_args!("{}", "longer")),
            Err(SendError::TooLong)
        );
        assert!(!gate.is_busy());
    }
}
