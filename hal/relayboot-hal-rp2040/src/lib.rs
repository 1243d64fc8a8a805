//! RP2040-specific HAL for the relayboot bootloader
//!
//! Implements the `relayboot-hal` traits on embassy-rp blocking drivers:
//!
//! - Program flash over XIP (implements `relayboot_hal::FirmwareFlash`)
//! - Bootup register in reserved no-init RAM
//! - GPIO by pin number, for config-driven button and LED assignment
//! - Application jump and system reset

#![no_std]

pub mod bootup;
pub mod flash;
pub mod gpio;
pub mod jump;
pub mod pins;

pub use bootup::RamBootup;
pub use flash::Rp2040Flash;
pub use gpio::{Rp2040Gpio, Rp2040Input, Rp2040Output};
pub use jump::{reboot, Rp2040Jumper};
pub use pins::{PinBank, PinError};
