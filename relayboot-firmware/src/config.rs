//! Board configuration
//!
//! Constants are generated from bootloader.toml at build time.

use relayboot_core::{BootConfig, ButtonConfig};
use relayboot_hal::Pull;

include!(concat!(env!("OUT_DIR"), "/config.rs"));

/// Core configuration for this board
pub fn boot_config() -> BootConfig {
    let mut config = BootConfig::new(APPLICATION_START, BLOCK_SIZE, MCU);
    if let Some(button) = BUTTON {
        config = config.with_button(button);
    }
    if let Some(window_ms) = DOUBLE_RESET_WINDOW_MS {
        config = config.with_double_reset(window_ms);
    }
    config
}
