//! Tick task for the main loop's time-based work
//!
//! Drives the keep-alive scheduler when the link is otherwise quiet.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker};

/// Tick interval in milliseconds
pub const TICK_INTERVAL_MS: u32 = 100;

/// Milliseconds since boot, latest value wins
pub static TICK_SIGNAL: Signal<CriticalSectionRawMutex, u32> = Signal::new();

#[embassy_executor::task]
pub async fn tick_task() {
    info!("Tick task started");

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS as u64));

    loop {
        ticker.next().await;
        TICK_SIGNAL.signal(now_ms());
    }
}

/// Wrapping millisecond tick
pub fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}
