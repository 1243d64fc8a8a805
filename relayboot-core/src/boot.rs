//! Boot mode decision
//!
//! Runs once per reset, before anything else, and picks between update mode
//! and the installed application. Update mode is entered when:
//!
//! 1. The bootup register holds [`REQUEST_SIGNATURE`] (application request
//!    or a double reset)
//! 2. The first application block is erased
//! 3. The update button reads its active level
//!
//! On the application path the double-reset window runs before returning.

use embedded_hal::delay::DelayNs;
use relayboot_hal::{BootupRegister, FirmwareFlash, GpioInputs, InputPin};
use relayboot_protocol::MAX_BLOCK_SIZE;

use crate::config::{BootConfig, ButtonConfig};
use crate::flash::ERASED_BYTE;
use crate::log;

/// Bootup register value that requests update mode
pub const REQUEST_SIGNATURE: u64 = 0x5984_E3FA_6CA1_589B;

/// Why update mode was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EntryReason {
    /// Bootup register carried the request signature
    Requested,
    /// No application installed
    NoApplication,
    /// Update button held
    Button,
}

/// Result of the boot decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootMode {
    /// Stay in the bootloader and accept an image
    Update(EntryReason),
    /// Jump to the application
    Application,
}

impl BootMode {
    pub fn is_update(&self) -> bool {
        matches!(self, BootMode::Update(_))
    }
}

/// Ask the bootloader to enter update mode on the next reset
///
/// Called by a running application before it resets the device.
pub fn request_update_mode<R: BootupRegister>(bootup: &mut R) {
    bootup.set_bootup_code(REQUEST_SIGNATURE);
}

/// Detects two resets in quick succession
///
/// Arms the bootup register for the length of the window. A reset during
/// the window leaves it armed, so the next boot enters update mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleResetDetector {
    window_ms: u32,
}

impl DoubleResetDetector {
    pub const fn new(window_ms: u32) -> Self {
        Self { window_ms }
    }

    pub fn window_ms(&self) -> u32 {
        self.window_ms
    }

    /// Arm, wait out the window, disarm
    pub fn check<R: BootupRegister, D: DelayNs>(&self, bootup: &mut R, delay: &mut D) {
        bootup.set_bootup_code(REQUEST_SIGNATURE);
        delay.delay_ms(self.window_ms);
        bootup.clear();
    }
}

/// Boot mode decision engine
pub struct BootDecision<'a> {
    config: &'a BootConfig,
}

impl<'a> BootDecision<'a> {
    pub fn new(config: &'a BootConfig) -> Self {
        Self { config }
    }

    /// Decide the boot mode
    ///
    /// Only reads flash. The bootup register is cleared on entry to update
    /// mode, and armed then cleared by the double-reset window.
    pub fn decide<F, R, G, D>(
        &self,
        flash: &mut F,
        bootup: &mut R,
        gpio: &mut G,
        delay: &mut D,
    ) -> BootMode
    where
        F: FirmwareFlash,
        R: BootupRegister,
        G: GpioInputs,
        D: DelayNs,
    {
        match self.update_reason(flash, bootup, gpio, delay) {
            Some(reason) => {
                bootup.clear();
                log::info!("entering update mode: {:?}", reason);
                BootMode::Update(reason)
            }
            None => {
                if let Some(window_ms) = self.config.double_reset_window_ms {
                    DoubleResetDetector::new(window_ms).check(bootup, delay);
                }
                BootMode::Application
            }
        }
    }

    fn update_reason<F, R, G, D>(
        &self,
        flash: &mut F,
        bootup: &mut R,
        gpio: &mut G,
        delay: &mut D,
    ) -> Option<EntryReason>
    where
        F: FirmwareFlash,
        R: BootupRegister,
        G: GpioInputs,
        D: DelayNs,
    {
        if bootup.bootup_code() == REQUEST_SIGNATURE {
            return Some(EntryReason::Requested);
        }

        if !self.application_present(flash) {
            log::info!("no application at {:#x}", self.config.application_start);
            return Some(EntryReason::NoApplication);
        }

        let button = self.config.button?;
        button_pressed(&button, self.config.button_settle_us, gpio, delay)
            .then_some(EntryReason::Button)
    }

    /// Whether the first application block holds anything but erased bytes
    ///
    /// An unreadable block counts as no application.
    pub fn application_present<F: FirmwareFlash>(&self, flash: &mut F) -> bool {
        let mut buf = [0u8; MAX_BLOCK_SIZE];
        let len = (self.config.block_size as usize).min(MAX_BLOCK_SIZE);
        let block = &mut buf[..len];

        match flash.read_block(self.config.application_start, block) {
            Ok(()) => block.iter().any(|&b| b != ERASED_BYTE),
            Err(e) => {
                log::warn!("application read failed: {:?}", e);
                false
            }
        }
    }
}

fn button_pressed<G: GpioInputs, D: DelayNs>(
    button: &ButtonConfig,
    settle_us: u32,
    gpio: &mut G,
    delay: &mut D,
) -> bool {
    match gpio.configure_input(button.pin, button.pull) {
        Ok(pin) => {
            delay.delay_us(settle_us);
            pin.is_high() == button.active_high
        }
        Err(e) => {
            log::warn!("button pin {} unavailable: {:?}", button.pin, e);
            false
        }
    }
}
