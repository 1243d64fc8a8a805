//! Bootloader configuration
//!
//! Every constant the core consumes lives in [`BootConfig`]. The firmware
//! builds one from its generated board constants; tests build them inline.

use relayboot_hal::Pull;
use relayboot_protocol::MAX_MCU_LEN;

pub use relayboot_protocol::MAX_BLOCK_SIZE;

/// Largest supported flash erase page in bytes
///
/// Sizes the static page staging buffer.
pub const MAX_PAGE_SIZE: usize = 4096;

/// Default delay between configuring the button pin and sampling it
pub const DEFAULT_BUTTON_SETTLE_US: u32 = 10;

/// Default delay between the final ack and the device reset
pub const DEFAULT_REBOOT_DELAY_MS: u32 = 100;

/// Update-mode button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonConfig {
    /// GPIO number
    pub pin: u8,
    /// Level that counts as pressed
    pub active_high: bool,
    /// Internal pull resistor
    pub pull: Pull,
}

impl ButtonConfig {
    /// Button that pulls the pin to ground when pressed
    pub const fn active_low(pin: u8) -> Self {
        Self {
            pin,
            active_high: false,
            pull: Pull::Up,
        }
    }

    /// Button that drives the pin high when pressed
    pub const fn active_high(pin: u8) -> Self {
        Self {
            pin,
            active_high: true,
            pull: Pull::Down,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Block size is zero, not word aligned, or above `MAX_BLOCK_SIZE`
    InvalidBlockSize,
    /// Block size does not divide the page size
    BlockPageMismatch,
    /// Page size is zero or not a power of two
    InvalidPageSize,
    /// Page size exceeds the staging buffer
    PageTooLarge,
    /// Application start is not page aligned
    UnalignedStart,
    /// MCU identifier does not fit in a connect response
    McuNameTooLong,
}

/// Bootloader configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootConfig {
    /// First address of the application image
    pub application_start: u32,
    /// Bytes per protocol block
    pub block_size: u32,
    /// MCU identifier reported on connect
    pub mcu: &'static str,
    /// Optional update-mode button
    pub button: Option<ButtonConfig>,
    /// Double-reset detection window, disabled when `None`
    pub double_reset_window_ms: Option<u32>,
    /// Settle time after configuring the button pin
    pub button_settle_us: u32,
    /// Delay before the final reset
    pub reboot_delay_ms: u32,
}

impl BootConfig {
    /// Configuration with no button and no double-reset detection
    pub const fn new(application_start: u32, block_size: u32, mcu: &'static str) -> Self {
        Self {
            application_start,
            block_size,
            mcu,
            button: None,
            double_reset_window_ms: None,
            button_settle_us: DEFAULT_BUTTON_SETTLE_US,
            reboot_delay_ms: DEFAULT_REBOOT_DELAY_MS,
        }
    }

    pub const fn with_button(mut self, button: ButtonConfig) -> Self {
        self.button = Some(button);
        self
    }

    pub const fn with_double_reset(mut self, window_ms: u32) -> Self {
        self.double_reset_window_ms = Some(window_ms);
        self
    }

    pub const fn with_button_settle_us(mut self, us: u32) -> Self {
        self.button_settle_us = us;
        self
    }

    pub const fn with_reboot_delay_ms(mut self, ms: u32) -> Self {
        self.reboot_delay_ms = ms;
        self
    }

    /// Number of 32-bit words in one block
    pub const fn block_words(&self) -> usize {
        self.block_size as usize / 4
    }

    /// Check the configuration against the flash page size
    pub fn validate(&self, page_size: u32) -> Result<(), ConfigError> {
        let block = self.block_size as usize;
        if block == 0 || block % 4 != 0 || block > MAX_BLOCK_SIZE {
            return Err(ConfigError::InvalidBlockSize);
        }
        if page_size == 0 || !page_size.is_power_of_two() {
            return Err(ConfigError::InvalidPageSize);
        }
        if page_size as usize > MAX_PAGE_SIZE {
            return Err(ConfigError::PageTooLarge);
        }
        if page_size % self.block_size != 0 {
            return Err(ConfigError::BlockPageMismatch);
        }
        if self.application_start % page_size != 0 {
            return Err(ConfigError::UnalignedStart);
        }
        if self.mcu.len() > MAX_MCU_LEN {
            return Err(ConfigError::McuNameTooLong);
        }
        Ok(())
    }
}
