//! relayboot - Serial Bootloader
//!
//! Bootloader binary for RP2040-based boards. On every reset it decides
//! between the installed application and update mode; in update mode it
//! receives a new image over UART0 and writes it to flash.

#![no_std]
#![no_main]

use defmt::*;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use relayboot_core::{BootDecision, BootMode, Session, UpdateLoop};
use relayboot_hal::Jumper;
use relayboot_hal_rp2040::{PinBank, Rp2040Flash, Rp2040Gpio, Rp2040Jumper, RamBootup};

use crate::link::SerialLink;

#[macro_use]
mod config;
mod link;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

#[cortex_m_rt::entry]
fn main() -> ! {
    info!("relayboot starting");

    let p = embassy_rp::init(Default::default());
    let boot_config = config::boot_config();

    let mut flash = Rp2040Flash::new(p.FLASH);
    let mut bootup = RamBootup::new();
    let mut bank = PinBank::new();
    claim_pins!(p, bank);
    let mut gpio = Rp2040Gpio::new(bank);
    let mut delay = Delay;

    let mode = BootDecision::new(&boot_config).decide(&mut flash, &mut bootup, &mut gpio, &mut delay);
    match mode {
        BootMode::Application => {
            info!("Starting application at {:#x}", boot_config.application_start);
            Rp2040Jumper.jump(boot_config.application_start)
        }
        BootMode::Update(reason) => info!("Update mode: {:?}", reason),
    }

    let session: Session<_> = match Session::new(boot_config, flash) {
        Ok(session) => session,
        Err(e) => {
            error!("Invalid configuration: {:?}", e);
            halt()
        }
    };

    // Status LED is optional; a missing pin only loses the indication
    let led = config::STATUS_LED.and_then(|pin| match gpio.configure_output(pin) {
        Ok(led) => Some(led),
        Err(e) => {
            warn!("Status LED on pin {} unavailable: {:?}", pin, e);
            None
        }
    });

    let mut uart_config = UartConfig::default();
    uart_config.baudrate = config::BAUD;

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART initialized at {} baud", config::BAUD);

    let mut link = SerialLink::new(tx, rx, led);
    let error = UpdateLoop::new(session).run(&mut link, &mut delay);

    // Flash fault: stay put rather than boot a partial image
    error!("Update failed: {:?}", error);
    halt()
}

fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
