//! Interrupt side of the pipeline
//!
//! The `USART1` vector runs the receive path to completion and reopens the
//! transmit gate. The main loop is woken through [`LINK_EVENT`] whenever
//! there is something for it to do.

use defmt::*;
use embassy_stm32::interrupt;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::once_lock::OnceLock;
use embassy_sync::signal::Signal;

use idlewire_core::Pipeline;
use idlewire_hal_stm32f0::{take_events, DmaCircularRx};

/// Receive ring size
pub const RX_RING_LEN: usize = 64;
/// Longest accepted line (payload + CR)
pub const LINE_LEN: usize = 64;
/// Transmit staging size
pub const TX_LEN: usize = 96;

pub type LinkPipeline = Pipeline<LINE_LEN, TX_LEN>;

/// State shared between the `USART1` vector and the main loop
pub struct Link {
    pub pipeline: LinkPipeline,
    pub rx: DmaCircularRx<RX_RING_LEN>,
}

pub static LINK: OnceLock<Link> = OnceLock::new();

/// Messages queued or transmitter released
pub static LINK_EVENT: Signal<CriticalSectionRawMutex, ()> = Signal::new();

#[interrupt]
fn USART1() {
    let events = take_events();
    let Some(link) = LINK.try_get() else {
        return;
    };

    if let Some(error) = events.error {
        link.rx.restart();
        let dropped = link.pipeline.reset_receiver(&link.rx);
        warn!("UART {}: receiver restarted, {} bytes dropped", error, dropped);
    }

    if events.idle && link.pipeline.on_line_idle(&link.rx) > 0 {
        LINK_EVENT.signal(());
    }

    if events.transfer_complete && link.pipeline.on_transfer_complete() {
        LINK_EVENT.signal(());
    }
}
