//! UART serial communication abstractions
//!
//! Provides traits for a receiver that is filled autonomously by a
//! circular transfer engine and a transmitter that moves one buffer at a
//! time without CPU involvement.

/// Receiver backed by a circular buffer that the hardware fills on its own
///
/// Once started, the engine writes every incoming byte at the next position
/// and wraps to zero at the end of the buffer, forever. Software never
/// re-arms it during normal operation.
pub trait CircularRx {
    /// Error type for starting reception
    type Error;

    /// Arm the engine once at startup
    fn start_continuous_receive(&mut self) -> Result<(), Self::Error>;

    /// Size of the circular buffer in bytes
    fn capacity(&self) -> usize;

    /// Bytes left to fill in the current pass over the buffer
    ///
    /// This is the hardware remaining-count register. It counts down from
    /// `capacity()` and reloads when it reaches zero.
    fn remaining_count(&self) -> usize;

    /// Read the byte stored at `index` (`index < capacity()`)
    fn byte_at(&self, index: usize) -> u8;

    /// Index the engine will write next
    ///
    /// Derived on demand as `capacity - remaining`. A remaining count of
    /// zero (caught just before reload) maps back to index 0.
    fn write_position(&self) -> usize {
        let capacity = self.capacity();
        if capacity == 0 {
            return 0;
        }
        (capacity - self.remaining_count().min(capacity)) % capacity
    }
}

/// Why an outbound transfer was not started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError<E> {
    /// A transfer is already running on the peripheral
    Busy,
    /// The peripheral rejected the request
    Peripheral(E),
}

/// Transmitter that moves one buffer per transfer
///
/// The binding reads `data` after `begin_transfer` returns. Callers must
/// leave the buffer untouched until the completion notification for that
/// transfer has been delivered.
pub trait DmaTx {
    /// Error type for transmit operations
    type Error;

    /// Start sending `data`
    fn begin_transfer(&mut self, data: &[u8]) -> Result<(), TransferError<Self::Error>>;

    /// Check whether the peripheral is still moving a buffer
    fn is_busy(&self) -> bool;
}

/// Receiver line fault reported by the peripheral
///
/// The binding clears the flag and keeps receiving; the pipeline only has
/// to tolerate a gap in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartError {
    /// Framing error
    Framing,
    /// Noise error
    Noise,
    /// Overrun error
    Overrun,
    /// Parity error
    Parity,
    /// Other error
    Other,
}

/// Interrupt causes decoded by a binding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineEvents {
    /// Receive line went idle after carrying data
    pub idle: bool,
    /// Outbound transfer finished
    pub transfer_complete: bool,
    /// Line fault, already cleared by the binding
    pub error: Option<UartError>,
}

impl LineEvents {
    /// Check if nothing needs handling
    pub fn is_empty(&self) -> bool {
        !self.idle && !self.transfer_complete && self.error.is_none()
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl UartConfig {
    /// Duration of one character on the wire, in microseconds
    ///
    /// This is also the idle-line detection delay: the receiver flags idle
    /// after one full character time without a start bit.
    pub fn char_time_us(&self) -> u32 {
        if self.baudrate == 0 {
            return 0;
        }
        let bits = 1 + self.data_bits.bits() + self.parity.bits() + self.stop_bits.bits();
        (bits * 1_000_000).div_ceil(self.baudrate)
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

impl DataBits {
    fn bits(self) -> u32 {
        match self {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
            DataBits::Nine => 9,
        }
    }
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl Parity {
    fn bits(self) -> u32 {
        match self {
            Parity::None => 0,
            Parity::Even | Parity::Odd => 1,
        }
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

impl StopBits {
    fn bits(self) -> u32 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}
