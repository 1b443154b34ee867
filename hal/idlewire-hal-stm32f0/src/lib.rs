//! STM32F0 binding for the Idlewire UART pipeline
//!
//! Drives USART1 through DMA1 with the fixed channel mapping of the F0
//! family:
//!
//! - Channel 3: USART1_RX, circular, never stopped
//! - Channel 2: USART1_TX, one-shot per transfer
//!
//! Line configuration (pins, baud rate, clocks) stays with embassy-stm32.
//! This crate only takes over the DMA request lines and the USART1
//! interrupt once the peripheral is running.
//!
//! # Features
//!
//! - `stm32f030r8` - NUCLEO-F030R8
//! - `stm32f072rb` - NUCLEO-F072RB / STM32F072B-DISCO
//! - `defmt` - Enable debug formatting support
//!
//! # Interrupts
//!
//! The firmware owns the `USART1` vector and calls [`take_events`] from it.
//! Transfer completion is taken from the USART `TC` flag rather than the
//! DMA channel interrupt, so the DMA vectors stay with embassy-stm32.

#![no_std]

mod regs;

pub mod dma_rx;
pub mod dma_tx;
pub mod uart;

pub use dma_rx::DmaCircularRx;
pub use dma_tx::{DmaTransmitter, TxError};
pub use uart::{enable_line_events, take_events, usart_config};
