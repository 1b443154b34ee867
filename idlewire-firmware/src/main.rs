//! Idlewire - DMA/idle-line UART line pipeline firmware
//!
//! Wires the board-agnostic pipeline to USART1 on an STM32F0:
//!
//! - DMA1 channel 3 fills a circular receive ring without CPU involvement
//! - The USART1 idle-line interrupt decodes whatever arrived since the
//!   previous one into CR/LF terminated lines
//! - The main loop reports each line and echoes it back, and sends a
//!   periodic keep-alive command whose own echo is filtered out
//!
//! Line settings and keep-alive behaviour come from `idlewire.toml`,
//! compiled in at build time.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::interrupt::{self, InterruptExt, Priority};
use embassy_stm32::usart::Uart;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use idlewire_core::{Pipeline, SendError};
use idlewire_hal::{CircularRx, DmaTx, UartConfig};
use idlewire_hal_stm32f0::{enable_line_events, usart_config, DmaCircularRx, DmaTransmitter};
use idlewire_protocol::{AtReply, Line};

use crate::link::{Link, LINE_LEN, LINK, LINK_EVENT, RX_RING_LEN, TX_LEN};
use crate::tasks::{heartbeat_task, tick_task, TICK_SIGNAL};

mod config;
mod link;
mod tasks;

static RX_RING: StaticCell<[u8; RX_RING_LEN]> = StaticCell::new();
static TX_STAGING: StaticCell<[u8; TX_LEN]> = StaticCell::new();

const BANNER: &[u8] = b"\r\nIdlewire ready\r\n";

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Idlewire firmware starting...");

    let p = embassy_stm32::init(Default::default());

    let config = config::load();
    info!("Pipeline config: {}", config);

    // PA5 is the user LED on the Nucleo boards
    let led = Output::new(p.PA5, Level::Low, Speed::Low);

    // USART1: PA9 TX, PA10 RX. The driver stays alive for the life of
    // the firmware; only the DMA requests and the interrupt are taken over.
    let line = UartConfig {
        baudrate: config.baudrate,
        ..Default::default()
    };
    let _uart = unwrap!(Uart::new_blocking(
        p.USART1,
        p.PA10,
        p.PA9,
        usart_config(&line)
    ));

    let pipeline = unwrap!(Pipeline::new(config));

    let mut rx = DmaCircularRx::new(RX_RING.init([0; RX_RING_LEN]));
    let mut tx = DmaTransmitter::new(TX_STAGING.init([0; TX_LEN]));

    if let Err(e) = rx.start_continuous_receive() {
        match e {}
    }

    if LINK.init(Link { pipeline, rx }).is_err() {
        defmt::panic!("link already initialised");
    }
    let link = LINK.get().await;

    enable_line_events();
    interrupt::USART1.set_priority(Priority::P1);
    // SAFETY: the handler only touches state published through LINK.
    unsafe { interrupt::USART1.enable() };

    info!(
        "Receive ring {} bytes at {} baud, char time {} us",
        RX_RING_LEN,
        line.baudrate,
        line.char_time_us()
    );

    spawner.spawn(unwrap!(heartbeat_task(led)));
    spawner.spawn(unwrap!(tick_task()));

    if let Err(e) = link.pipeline.try_send(&mut tx, BANNER) {
        warn!("Banner not sent: {}", e);
    }

    run(&link.pipeline, &mut tx).await
}

/// Cooperative main loop
async fn run<T>(pipeline: &Pipeline<LINE_LEN, TX_LEN>, tx: &mut T) -> !
where
    T: DmaTx,
    T::Error: Format,
{
    loop {
        let now_ms = match select(LINK_EVENT.wait(), TICK_SIGNAL.wait()).await {
            Either::First(()) => tasks::tick::now_ms(),
            Either::Second(tick) => tick,
        };

        match pipeline.poll_periodic_send(tx, now_ms) {
            Some(Ok(())) => {
                debug!("Keep-alive sent");
                debug!("Link stats: {}", pipeline.stats());
            }
            Some(Err(SendError::Busy)) => debug!("Keep-alive skipped, transmitter busy"),
            Some(Err(e)) => warn!("Keep-alive failed: {}", e),
            None => {}
        }

        // One reply in flight at a time; the rest wait for the completion
        // interrupt to wake us again.
        while !pipeline.is_tx_busy() {
            let Some(line) = pipeline.next_message() else {
                break;
            };
            handle_line(pipeline, tx, &line);
        }
    }
}

/// Report a received line and echo it back
fn handle_line<T>(pipeline: &Pipeline<LINE_LEN, TX_LEN>, tx: &mut T, line: &Line<LINE_LEN>)
where
    T: DmaTx,
    T::Error: Format,
{
    let Some(text) = line.as_str() else {
        warn!("Dropped non-UTF-8 line ({} bytes)", line.len());
        return;
    };

    match AtReply::classify(line.as_bytes()) {
        AtReply::Ok => info!("RX ok: {}", text),
        AtReply::Error => warn!("RX error: {}", text),
        AtReply::Data => info!("RX: {}", text),
    }

    match pipeline.try_send_fmt(tx, format_args!("\r\n[RX] {}\r\n", text)) {
        Ok(()) => {}
        Err(SendError::Busy) => debug!("Echo dropped, transmitter busy"),
        Err(e) => warn!("Echo failed: {}", e),
    }
}
