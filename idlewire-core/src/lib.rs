//! Board-agnostic core of the UART line pipeline
//!
//! This crate contains everything between the DMA engine and the
//! application that does not depend on a specific chip:
//!
//! - Receive ring arithmetic and a software-filled ring
//! - Idle-line frame boundary detection
//! - Self-echo suppression for outbound commands
//! - Single-in-flight transmit gate
//! - Keep-alive scheduling
//! - Link statistics and configuration types
//!
//! [`Pipeline`] ties them together. It is built once, placed in static
//! storage by the firmware, and shared by reference between the interrupt
//! handlers and the main loop. Every method takes `&self`.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod correlator;
pub mod framing;
pub mod gate;
pub mod pipeline;
pub mod ring;
pub mod scheduler;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, KeepAliveConfig, PipelineConfig};
pub use correlator::{CommandCorrelator, Correlation, EchoPolicy, PendingCommand};
pub use framing::{Drain, Flow, FrameDetector, FramingPolicy, ScanPolicy};
pub use gate::{SendError, TxGate};
pub use pipeline::{Pipeline, MAILBOX_DEPTH};
pub use ring::{SoftRing, Span};
pub use scheduler::KeepAliveTimer;
pub use stats::{LinkStats, StatsSnapshot};
