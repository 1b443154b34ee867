//! The receive/transmit pipeline
//!
//! Data flow:
//!
//! ```text
//! DMA ──► ring ──(idle irq)──► FrameDetector ──► LineAssembler ──► mailbox
//!                                                                     │
//!                                                       (main loop)   ▼
//!                  DmaTx ◄── TxGate ◄── application ◄── CommandCorrelator
//! ```
//!
//! Interrupt context calls [`Pipeline::on_line_idle`] and
//! [`Pipeline::on_transfer_complete`]. Everything else belongs to the main
//! loop. Neither side blocks: state shared between them sits behind short
//! critical sections or in atomics.

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use heapless::Deque;
use idlewire_hal::{CircularRx, DmaTx};
use idlewire_protocol::{encode_line, strip_terminator, Feed, Line, LineAssembler, TERMINATOR};
use portable_atomic::{AtomicU32, Ordering};

use crate::config::{ConfigError, PipelineConfig, MAX_COMMAND_LEN};
use crate::correlator::{CommandCorrelator, Correlation, PendingCommand};
use crate::framing::{Flow, FrameDetector, ScanPolicy};
use crate::gate::{SendError, TxGate};
use crate::scheduler::KeepAliveTimer;
use crate::stats::{LinkStats, StatsSnapshot};

/// Completed messages waiting for the main loop
pub const MAILBOX_DEPTH: usize = 4;

struct RxState<const LINE: usize> {
    assembler: LineAssembler<LINE>,
    mailbox: Deque<Line<LINE>, MAILBOX_DEPTH>,
}

/// Explicitly owned pipeline shared by the interrupt handlers and main loop
///
/// - `LINE`: assembler capacity (payload + CR)
/// - `TX`: transmit buffer capacity
pub struct Pipeline<const LINE: usize, const TX: usize> {
    config: PipelineConfig,
    detector: FrameDetector,
    rx: CriticalSectionMutex<RefCell<RxState<LINE>>>,
    correlator: CriticalSectionMutex<RefCell<CommandCorrelator<MAX_COMMAND_LEN>>>,
    gate: TxGate<TX>,
    keepalive: Option<KeepAliveTimer>,
    last_tick_ms: AtomicU32,
    stats: LinkStats,
}

impl<const LINE: usize, const TX: usize> Pipeline<LINE, TX> {
    /// Build a pipeline from a validated configuration
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let keepalive = config
            .keepalive
            .as_ref()
            .map(|k| KeepAliveTimer::new(k.interval_ms));

        Ok(Self {
            detector: FrameDetector::new(config.framing),
            rx: CriticalSectionMutex::new(RefCell::new(RxState {
                assembler: LineAssembler::new(),
                mailbox: Deque::new(),
            })),
            correlator: CriticalSectionMutex::new(RefCell::new(CommandCorrelator::new(config.echo))),
            gate: TxGate::new(),
            keepalive,
            last_tick_ms: AtomicU32::new(0),
            stats: LinkStats::new(),
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ----- interrupt context -----

    /// Idle-line notification: decode everything received since the last one
    ///
    /// Runs to completion without allocating. Returns the number of
    /// messages queued for the main loop.
    pub fn on_line_idle<R: CircularRx + ?Sized>(&self, rx: &R) -> usize {
        let stop_at_first = self.config.scan == ScanPolicy::StopAtFirst;
        let stats = &self.stats;

        self.rx.lock(|cell| {
            let mut state = cell.borrow_mut();
            let RxState { assembler, mailbox } = &mut *state;
            let mut queued = 0;

            // An idle gap also closes a message that overflowed
            assembler.end_resync();

            let drain = self.detector.drain(rx, |byte| match assembler.feed(byte) {
                Feed::Complete(line) => {
                    stats.record_line();
                    if !line.is_empty() {
                        if mailbox.push_back(line).is_ok() {
                            queued += 1;
                        } else {
                            stats.record_mailbox_drop();
                        }
                    }
                    if stop_at_first {
                        Flow::Stop
                    } else {
                        Flow::Continue
                    }
                }
                Feed::Overflow => {
                    stats.record_overflow();
                    Flow::Continue
                }
                Feed::Pending | Feed::Discarded => Flow::Continue,
            });

            stats.record_drain(drain.delivered, drain.skipped);
            queued
        })
    }

    /// Transfer-complete notification: reopen the transmit gate
    ///
    /// Returns `false` for a notification with no transfer in flight.
    pub fn on_transfer_complete(&self) -> bool {
        let completed = self.gate.complete();
        if completed {
            self.stats.record_send_completed();
        }
        completed
    }

    /// Recover from a receiver fault reported by the binding
    ///
    /// Drops the partial message and anything not yet drained, then
    /// continues from the current write position. Returns the number of
    /// bytes dropped.
    pub fn reset_receiver<R: CircularRx + ?Sized>(&self, rx: &R) -> usize {
        let dropped = self.rx.lock(|cell| {
            cell.borrow_mut().assembler.reset();
            self.detector.resync(rx)
        });
        self.stats.record_receiver_restart();
        dropped
    }

    // ----- main loop -----

    /// Next message from the attached device
    ///
    /// Echoes of our own commands are discarded on the way out.
    pub fn next_message(&self) -> Option<Line<LINE>> {
        loop {
            let line = self.rx.lock(|cell| cell.borrow_mut().mailbox.pop_front())?;
            let verdict = self
                .correlator
                .lock(|cell| cell.borrow_mut().correlate(line.as_bytes()));

            match verdict {
                Correlation::Echo => self.stats.record_echo(),
                Correlation::External => return Some(line),
            }
        }
    }

    /// Hand every waiting external message to `on_message`
    ///
    /// Returns the number of messages delivered.
    pub fn dispatch<F>(&self, mut on_message: F) -> usize
    where
        F: FnMut(&Line<LINE>),
    {
        let mut delivered = 0;
        while let Some(line) = self.next_message() {
            on_message(&line);
            delivered += 1;
        }
        delivered
    }

    /// Number of messages waiting, echoes included
    pub fn queued_messages(&self) -> usize {
        self.rx.lock(|cell| cell.borrow().mailbox.len())
    }

    /// Send raw bytes and remember the last line for echo suppression
    ///
    /// Use [`Pipeline::try_send_fmt`] for replies that must not be
    /// matched against the peer's echo.
    pub fn try_send<T: DmaTx>(&self, tx: &mut T, data: &[u8]) -> Result<(), SendError<T::Error>> {
        if data.len() > TX {
            self.stats.record_send_failed();
            return Err(SendError::TooLong);
        }

        let now_ms = self.last_tick_ms.load(Ordering::Relaxed);
        let result = self.send_recording(tx, last_line(data), now_ms, |buf| {
            buf.extend_from_slice(data).map_err(|_| ())
        });
        self.record_send(&result, !data.is_empty());
        result
    }

    /// Send formatted text without recording it
    pub fn try_send_fmt<T: DmaTx>(
        &self,
        tx: &mut T,
        args: fmt::Arguments<'_>,
    ) -> Result<(), SendError<T::Error>> {
        let result = self.gate.try_send_fmt(tx, args);
        self.record_send(&result, true);
        result
    }

    /// Send a command line and remember it for echo suppression
    ///
    /// The terminator is appended if missing. The record is written only
    /// once the gate is claimed, so a busy rejection leaves the previous
    /// command in place.
    pub fn send_command<T: DmaTx>(
        &self,
        tx: &mut T,
        command: &[u8],
        now_ms: u32,
    ) -> Result<(), SendError<T::Error>> {
        self.last_tick_ms.store(now_ms, Ordering::Relaxed);

        let body = strip_terminator(command);
        if body.is_empty() {
            return Ok(());
        }
        if body.len() > MAX_COMMAND_LEN || body.len() + TERMINATOR.len() > TX {
            self.stats.record_send_failed();
            return Err(SendError::TooLong);
        }

        let result = self.send_recording(tx, body, now_ms, |buf| {
            buf.resize_default(body.len() + TERMINATOR.len())?;
            encode_line(body, buf).map_err(|_| ())?;
            Ok(())
        });
        self.record_send(&result, true);
        result
    }

    /// Scheduler tick: send the keep-alive command if its period is due
    ///
    /// Returns `None` when nothing was due. A due period that finds the
    /// gate busy is skipped, not retried.
    pub fn poll_periodic_send<T: DmaTx>(
        &self,
        tx: &mut T,
        now_ms: u32,
    ) -> Option<Result<(), SendError<T::Error>>> {
        self.last_tick_ms.store(now_ms, Ordering::Relaxed);

        let keepalive = self.config.keepalive.as_ref()?;
        let timer = self.keepalive.as_ref()?;
        if !timer.claim(now_ms) {
            return None;
        }

        let result = self.send_command(tx, keepalive.command.as_bytes(), now_ms);
        if matches!(result, Err(SendError::Busy)) {
            self.stats.record_keepalive_skipped();
        }
        Some(result)
    }

    /// Check if a transfer is in flight
    pub fn is_tx_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Last command sent and not yet echoed
    pub fn pending_command(&self) -> Option<PendingCommand<MAX_COMMAND_LEN>> {
        self.correlator.lock(|cell| cell.borrow().pending().cloned())
    }

    /// Copy of the link counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Claim the gate and record `echo` once the outbound bytes are built
    ///
    /// An empty `echo` leaves the previous record alone. A failed transfer
    /// clears whatever was recorded.
    fn send_recording<T, F>(
        &self,
        tx: &mut T,
        echo: &[u8],
        now_ms: u32,
        fill: F,
    ) -> Result<(), SendError<T::Error>>
    where
        T: DmaTx,
        F: FnOnce(&mut heapless::Vec<u8, TX>) -> Result<(), ()>,
    {
        let mut recorded = false;
        let result = self.gate.try_send_with(tx, |buf| {
            fill(buf)?;
            if !echo.is_empty() {
                recorded = self
                    .correlator
                    .lock(|cell| cell.borrow_mut().record(echo, now_ms));
            }
            Ok(())
        });

        if result.is_err() && recorded {
            self.correlator.lock(|cell| cell.borrow_mut().clear());
        }
        result
    }

    fn record_send<E>(&self, result: &Result<(), SendError<E>>, started: bool) {
        match result {
            Ok(()) if started => self.stats.record_send_started(),
            Ok(()) => {}
            Err(SendError::Busy) => self.stats.record_send_busy(),
            Err(_) => self.stats.record_send_failed(),
        }
    }
}

/// Final line of an outbound payload, terminator removed
fn last_line(data: &[u8]) -> &[u8] {
    let body = strip_terminator(data);
    match body.iter().rposition(|&b| b == b'\r' || b == b'\n') {
        Some(i) => &body[i + 1..],
        None => body,
    }
}
