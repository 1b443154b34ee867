//! USART1 line events and configuration for STM32F0

use embassy_stm32::usart;
use idlewire_hal::{DataBits, LineEvents, Parity, StopBits, UartConfig, UartError};

use crate::regs::{self, usart as bits};

/// Translate line settings into an embassy-stm32 UART configuration
pub fn usart_config(config: &UartConfig) -> usart::Config {
    let mut out = usart::Config::default();
    out.baudrate = config.baudrate;
    out.data_bits = match config.data_bits {
        DataBits::Seven => usart::DataBits::DataBits7,
        DataBits::Eight => usart::DataBits::DataBits8,
        DataBits::Nine => usart::DataBits::DataBits9,
    };
    out.parity = match config.parity {
        Parity::None => usart::Parity::ParityNone,
        Parity::Even => usart::Parity::ParityEven,
        Parity::Odd => usart::Parity::ParityOdd,
    };
    out.stop_bits = match config.stop_bits {
        StopBits::One => usart::StopBits::STOP1,
        StopBits::Two => usart::StopBits::STOP2,
    };
    out
}

/// Enable the idle-line and error interrupts
///
/// Call after the UART is configured and the receiver started. Stale
/// flags from before the ring was armed are discarded.
pub fn enable_line_events() {
    regs::usart_clear(bits::IDLE | bits::ERRORS);
    regs::usart_cr3_set(bits::EIE);
    regs::usart_cr1_set(bits::IDLEIE);
}

/// Read and acknowledge pending USART1 events
///
/// Called from the `USART1` interrupt. Transfer completion is reported
/// once per transfer: the completion interrupt is masked again here.
pub fn take_events() -> LineEvents {
    let isr = regs::usart_isr();
    let mut events = LineEvents::default();

    if isr & bits::IDLE != 0 {
        events.idle = true;
    }

    if isr & bits::TC != 0 && regs::usart_cr1() & bits::TCIE != 0 {
        regs::usart_cr1_clear(bits::TCIE);
        events.transfer_complete = true;
    }

    events.error = decode_error(isr);

    regs::usart_clear(isr & (bits::IDLE | bits::ERRORS));
    events
}

/// Most severe error flagged in an ISR value
fn decode_error(isr: u32) -> Option<UartError> {
    if isr & bits::ORE != 0 {
        Some(UartError::Overrun)
    } else if isr & bits::FE != 0 {
        Some(UartError::Framing)
    } else if isr & bits::NF != 0 {
        Some(UartError::Noise)
    } else if isr & bits::PE != 0 {
        Some(UartError::Parity)
    } else {
        None
    }
}
