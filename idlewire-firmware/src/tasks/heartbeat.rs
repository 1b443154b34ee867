//! Status LED

use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Ticker};

/// LED toggle period
const BLINK_MS: u64 = 500;

#[embassy_executor::task]
pub async fn heartbeat_task(mut led: Output<'static>) {
    let mut ticker = Ticker::every(Duration::from_millis(BLINK_MS));

    loop {
        ticker.next().await;
        led.toggle();
    }
}
