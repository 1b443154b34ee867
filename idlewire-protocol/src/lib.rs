//! Idlewire Line Protocol
//!
//! This crate defines how bytes on the UART become messages: plain text
//! lines terminated by carriage return + line feed, as spoken by AT-command
//! modems and most serial consoles.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌─────────────────────────┬──────┬──────┐
//! │ PAYLOAD                 │  CR  │  LF  │
//! │ 0..N-1 bytes            │ 0x0D │ 0x0A │
//! └─────────────────────────┴──────┴──────┘
//! ```
//!
//! There is no length prefix and no checksum. A message is whatever arrived
//! since the previous terminator; messages longer than the assembler
//! capacity are dropped.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod at;
pub mod line;

pub use at::AtReply;
pub use line::{encode_line, strip_terminator, Feed, Line, LineAssembler, LineError, TERMINATOR};
