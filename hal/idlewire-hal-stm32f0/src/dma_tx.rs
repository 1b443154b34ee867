//! One-shot DMA transmission on DMA1 channel 2

use core::sync::atomic::{compiler_fence, Ordering};

use idlewire_hal::{DmaTx, TransferError};

use crate::regs::{self, dma, usart, TX_CHANNEL};

/// Transmit errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxError {
    /// Payload larger than the staging buffer
    TooLong,
}

/// USART1 transmitter
///
/// Outbound bytes are copied into a 'static staging buffer before the
/// channel is armed, so the caller's slice is free as soon as
/// [`DmaTx::begin_transfer`] returns. The transfer counts as in flight
/// until the USART reports transmission complete.
pub struct DmaTransmitter<const N: usize> {
    buffer: &'static mut [u8; N],
}

impl<const N: usize> DmaTransmitter<N> {
    const SIZE_OK: () = assert!(N > 0 && N <= 0xFFFF, "buffer must fit the 16-bit transfer counter");

    /// Take ownership of the staging buffer and route TX requests to DMA
    pub fn new(buffer: &'static mut [u8; N]) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::SIZE_OK;
        regs::enable_dma_clock();

        let ch = regs::channel(TX_CHANNEL);
        regs::disable_channel(ch);
        ch.par().write_value(regs::tdr_address());
        regs::usart_cr3_set(usart::DMAT);

        Self { buffer }
    }
}

impl<const N: usize> DmaTx for DmaTransmitter<N> {
    type Error = TxError;

    fn begin_transfer(&mut self, data: &[u8]) -> Result<(), TransferError<TxError>> {
        if self.is_busy() {
            return Err(TransferError::Busy);
        }
        if data.len() > N {
            return Err(TransferError::Peripheral(TxError::TooLong));
        }
        if data.is_empty() {
            return Ok(());
        }

        self.buffer[..data.len()].copy_from_slice(data);
        compiler_fence(Ordering::Release);

        let ch = regs::channel(TX_CHANNEL);
        regs::disable_channel(ch);
        ch.mar().write_value(self.buffer.as_ptr() as u32);
        ch.ndtr().write(|w| w.0 = data.len() as u32);

        regs::usart_clear(usart::TC);
        regs::usart_cr1_set(usart::TCIE);
        ch.cr()
            .write(|w| w.0 = dma::MINC | dma::DIR_FROM_MEMORY | dma::PL_MEDIUM | dma::EN);

        Ok(())
    }

    fn is_busy(&self) -> bool {
        regs::usart_cr1() & usart::TCIE != 0
    }
}
