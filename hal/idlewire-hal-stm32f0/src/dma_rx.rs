//! Circular DMA reception on DMA1 channel 3

use core::convert::Infallible;
use core::ptr;
use core::sync::atomic::{compiler_fence, Ordering};

use idlewire_hal::CircularRx;

use crate::regs::{self, dma, usart, RX_CHANNEL};

/// USART1 receive ring filled by DMA
///
/// Once started, the channel runs in circular mode forever. Software only
/// reads the remaining-count register and the buffer, so the receiver
/// can be shared between the interrupt handler and the main loop.
pub struct DmaCircularRx<const N: usize> {
    buffer: *const u8,
}

// SAFETY: the DMA engine is the only writer of `buffer`, which is 'static.
// Software access is read-only and volatile.
unsafe impl<const N: usize> Sync for DmaCircularRx<N> {}
unsafe impl<const N: usize> Send for DmaCircularRx<N> {}

impl<const N: usize> DmaCircularRx<N> {
    const SIZE_OK: () = assert!(N > 0 && N <= 0xFFFF, "ring must fit the 16-bit transfer counter");

    /// Take ownership of the ring storage
    ///
    /// Reception does not begin until [`CircularRx::start_continuous_receive`]
    /// or [`DmaCircularRx::restart`].
    pub fn new(buffer: &'static mut [u8; N]) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::SIZE_OK;
        regs::enable_dma_clock();
        Self {
            buffer: buffer.as_ptr(),
        }
    }

    /// (Re)arm the channel from the start of the ring
    ///
    /// The write position returns to 0. Callers realign their read cursor
    /// afterwards.
    pub fn restart(&self) {
        let ch = regs::channel(RX_CHANNEL);
        regs::disable_channel(ch);

        ch.par().write_value(regs::rdr_address());
        ch.mar().write_value(self.buffer as u32);
        ch.ndtr().write(|w| w.0 = N as u32);
        compiler_fence(Ordering::SeqCst);
        ch.cr()
            .write(|w| w.0 = dma::MINC | dma::CIRC | dma::PL_HIGH | dma::EN);

        regs::usart_cr3_set(usart::DMAR);
    }
}

impl<const N: usize> CircularRx for DmaCircularRx<N> {
    type Error = Infallible;

    fn start_continuous_receive(&mut self) -> Result<(), Infallible> {
        self.restart();
        Ok(())
    }

    fn capacity(&self) -> usize {
        N
    }

    fn remaining_count(&self) -> usize {
        let remaining = regs::channel(RX_CHANNEL).ndtr().read().0 & 0xFFFF;
        compiler_fence(Ordering::Acquire);
        remaining as usize
    }

    fn byte_at(&self, index: usize) -> u8 {
        // SAFETY: index is reduced into the ring; the storage is 'static and
        // the DMA engine writes whole bytes.
        unsafe { ptr::read_volatile(self.buffer.add(index % N)) }
    }
}
