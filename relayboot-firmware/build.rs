//! Build script for relayboot-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates bootloader.toml and generates the board constants

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Flash layout limits (must match memory.x)
const FLASH_BASE: u32 = 0x1000_0000;
const FLASH_SIZE: u32 = 2 * 1024 * 1024;
const BOOTLOADER_SIZE: u32 = 16 * 1024;
const ERASE_SIZE: u32 = 4096;

/// Block and identifier limits of the wire protocol
const MAX_BLOCK_SIZE: u32 = 64;
const MAX_MCU_LEN: usize = 112;

/// GPIOs taken by UART0
const UART_PINS: [u8; 2] = [0, 1];
const GPIO_COUNT: u8 = 30;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BootloaderToml {
    mcu: String,
    application_start: u32,
    block_size: u32,
    serial: Option<SerialSection>,
    button: Option<ButtonSection>,
    double_reset: Option<DoubleResetSection>,
    status_led: Option<StatusLedSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SerialSection {
    baud: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ButtonSection {
    pin: u8,
    active: String,
    pull: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DoubleResetSection {
    window_ms: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatusLedSection {
    pin: u8,
}

fn main() {
    setup_linker();
    let config = load_config();
    validate_config(&config);
    generate_config(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Read and parse bootloader.toml
fn load_config() -> BootloaderToml {
    println!("cargo:rerun-if-changed=bootloader.toml");

    let config_path = Path::new("bootloader.toml");
    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: bootloader.toml not found!                               ║\n\
            ║                                                                  ║\n\
            ║  The bootloader requires a bootloader.toml board description     ║\n\
            ║  in the relayboot-firmware directory.                            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read bootloader.toml                           ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid bootloader.toml                                  ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&e.to_string())
            );
        }
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check every value against the flash layout and protocol limits
fn validate_config(config: &BootloaderToml) {
    let mut errors = Vec::new();

    if config.mcu.is_empty() || config.mcu.len() > MAX_MCU_LEN {
        errors.push(format!("mcu must be 1 to {} characters", MAX_MCU_LEN));
    }

    let app_floor = FLASH_BASE + BOOTLOADER_SIZE;
    if config.application_start < app_floor
        || config.application_start >= FLASH_BASE + FLASH_SIZE
    {
        errors.push(format!(
            "application_start {:#x} must lie in {:#x}..{:#x}",
            config.application_start,
            app_floor,
            FLASH_BASE + FLASH_SIZE
        ));
    }
    if config.application_start % ERASE_SIZE != 0 {
        errors.push(format!(
            "application_start {:#x} is not {}-byte aligned",
            config.application_start, ERASE_SIZE
        ));
    }

    let block = config.block_size;
    if block == 0 || block % 4 != 0 || block > MAX_BLOCK_SIZE || ERASE_SIZE % block != 0 {
        errors.push(format!(
            "block_size {} must be a multiple of 4, at most {}, dividing {}",
            block, MAX_BLOCK_SIZE, ERASE_SIZE
        ));
    }

    if let Some(serial) = &config.serial {
        if serial.baud == 0 {
            errors.push("serial.baud must be non-zero".to_string());
        }
    }

    let mut pins = Vec::new();
    if let Some(button) = &config.button {
        pins.push(("button", button.pin));
        if !matches!(button.active.as_str(), "low" | "high") {
            errors.push(format!("button.active '{}' must be low or high", button.active));
        }
        if let Some(pull) = &button.pull {
            if !matches!(pull.as_str(), "none" | "up" | "down") {
                errors.push(format!("button.pull '{}' must be none, up or down", pull));
            }
        }
    }
    if let Some(led) = &config.status_led {
        pins.push(("status_led", led.pin));
    }
    for (name, pin) in &pins {
        if *pin >= GPIO_COUNT {
            errors.push(format!("{}.pin {} does not exist", name, pin));
        }
        if UART_PINS.contains(pin) {
            errors.push(format!("{}.pin {} is used by the serial link", name, pin));
        }
    }
    if pins.len() == 2 && pins[0].1 == pins[1].1 {
        errors.push(format!("button and status_led share pin {}", pins[0].1));
    }

    if let Some(double_reset) = &config.double_reset {
        if double_reset.window_ms == 0 {
            errors.push("double_reset.window_ms must be non-zero".to_string());
        }
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: bootloader.toml validation failed                        ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            format_error_lines(&errors.join("\n"))
        );
    }

    println!("cargo:warning=bootloader.toml validated successfully");
}

/// Emit `$OUT_DIR/config.rs`
fn generate_config(config: &BootloaderToml) {
    let mut out = String::new();

    out.push_str("// Generated from bootloader.toml by build.rs\n\n");
    out.push_str(&format!("pub const MCU: &str = {:?};\n", config.mcu));
    out.push_str(&format!(
        "pub const APPLICATION_START: u32 = {:#x};\n",
        config.application_start
    ));
    out.push_str(&format!("pub const BLOCK_SIZE: u32 = {};\n", config.block_size));

    let baud = config.serial.as_ref().map_or(250_000, |s| s.baud);
    out.push_str(&format!("pub const BAUD: u32 = {};\n", baud));

    match &config.button {
        Some(button) => {
            let pull = match button.pull.as_deref() {
                Some("none") => "None",
                Some("down") => "Down",
                Some("up") => "Up",
                _ if button.active == "high" => "Down",
                _ => "Up",
            };
            out.push_str(&format!(
                "pub const BUTTON: Option<ButtonConfig> = Some(ButtonConfig {{ pin: {}, active_high: {}, pull: Pull::{} }});\n",
                button.pin,
                button.active == "high",
                pull
            ));
        }
        None => out.push_str("pub const BUTTON: Option<ButtonConfig> = None;\n"),
    }

    match &config.double_reset {
        Some(d) => out.push_str(&format!(
            "pub const DOUBLE_RESET_WINDOW_MS: Option<u32> = Some({});\n",
            d.window_ms
        )),
        None => out.push_str("pub const DOUBLE_RESET_WINDOW_MS: Option<u32> = None;\n"),
    }

    match &config.status_led {
        Some(led) => out.push_str(&format!(
            "pub const STATUS_LED: Option<u8> = Some({});\n",
            led.pin
        )),
        None => out.push_str("pub const STATUS_LED: Option<u8> = None;\n"),
    }

    // Pins are moved out of the peripherals by literal name
    out.push_str("\n/// Move the configured pins into a pin bank\n");
    out.push_str("macro_rules! claim_pins {\n    ($p:ident, $bank:ident) => {\n");
    let pins = config
        .button
        .iter()
        .map(|b| b.pin)
        .chain(config.status_led.iter().map(|l| l.pin));
    for pin in pins {
        out.push_str(&format!(
            "        if let Err(e) = $bank.insert({pin}, relayboot_hal_rp2040::take_pin!($p, {pin})) {{\n            defmt::warn!(\"pin {pin} unavailable: {{:?}}\", e);\n        }}\n"
        ));
    }
    out.push_str("    };\n}\n");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("config.rs"), out).unwrap();
}
