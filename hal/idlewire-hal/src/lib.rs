//! Idlewire Hardware Abstraction Layer
//!
//! This crate defines the narrow interface between the line pipeline and
//! a chip-specific UART/DMA binding. The pipeline never touches registers;
//! it only asks the binding where the DMA engine is and hands it bytes to
//! transmit.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (idlewire-firmware)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  idlewire-core (pipeline)               │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  idlewire-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!          ┌──────────────────────┐
//!          │ idlewire-hal-stm32f0 │
//!          └──────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::CircularRx`] - Autonomous circular receive buffer
//! - [`uart::DmaTx`] - One-shot outbound transfer

#![no_std]
#![deny(unsafe_code)]

pub mod uart;

// Re-export key traits at crate root for convenience
pub use uart::{
    CircularRx, DataBits, DmaTx, LineEvents, Parity, StopBits, TransferError, UartConfig, UartError,
};
