//! Register bits used by the binding
//!
//! Accessed as raw values so the same code serves every F0 part.

use embassy_stm32::pac;
use embassy_stm32::pac::bdma::Ch;

/// DMA1 channel 3 (zero-based index 2)
pub(crate) const RX_CHANNEL: usize = 2;
/// DMA1 channel 2 (zero-based index 1)
pub(crate) const TX_CHANNEL: usize = 1;

pub(crate) mod usart {
    // ISR / ICR
    pub const PE: u32 = 1 << 0;
    pub const FE: u32 = 1 << 1;
    pub const NF: u32 = 1 << 2;
    pub const ORE: u32 = 1 << 3;
    pub const IDLE: u32 = 1 << 4;
    pub const TC: u32 = 1 << 6;
    pub const ERRORS: u32 = PE | FE | NF | ORE;

    // CR1
    pub const IDLEIE: u32 = 1 << 4;
    pub const TCIE: u32 = 1 << 6;

    // CR3
    pub const EIE: u32 = 1 << 0;
    pub const DMAR: u32 = 1 << 6;
    pub const DMAT: u32 = 1 << 7;
}

pub(crate) mod dma {
    // CCR
    pub const EN: u32 = 1 << 0;
    pub const DIR_FROM_MEMORY: u32 = 1 << 4;
    pub const CIRC: u32 = 1 << 5;
    pub const MINC: u32 = 1 << 7;
    pub const PL_HIGH: u32 = 0b10 << 12;
    pub const PL_MEDIUM: u32 = 0b01 << 12;
}

/// RCC_AHBENR.DMAEN
const RCC_DMAEN: u32 = 1 << 0;

pub(crate) fn enable_dma_clock() {
    pac::RCC.ahbenr().modify(|w| w.0 |= RCC_DMAEN);
}

pub(crate) fn channel(index: usize) -> Ch {
    pac::DMA1.ch(index)
}

/// Stop a channel and wait for the hardware to release it
pub(crate) fn disable_channel(ch: Ch) {
    ch.cr().modify(|w| w.0 &= !dma::EN);
    while ch.cr().read().0 & dma::EN != 0 {}
}

pub(crate) fn usart_isr() -> u32 {
    pac::USART1.isr().read().0
}

pub(crate) fn usart_clear(flags: u32) {
    pac::USART1.icr().write(|w| w.0 = flags);
}

pub(crate) fn usart_cr1_set(bits: u32) {
    pac::USART1.cr1().modify(|w| w.0 |= bits);
}

pub(crate) fn usart_cr1_clear(bits: u32) {
    pac::USART1.cr1().modify(|w| w.0 &= !bits);
}

pub(crate) fn usart_cr1() -> u32 {
    pac::USART1.cr1().read().0
}

pub(crate) fn usart_cr3_set(bits: u32) {
    pac::USART1.cr3().modify(|w| w.0 |= bits);
}

pub(crate) fn rdr_address() -> u32 {
    pac::USART1.rdr().as_ptr() as u32
}

pub(crate) fn tdr_address() -> u32 {
    pac::USART1.tdr().as_ptr() as u32
}
