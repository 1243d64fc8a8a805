//! relayboot Hardware Abstraction Layer
//!
//! This crate defines the collaborator traits the bootloader core is written
//! against. Chip-specific HALs (RP2040, ...) implement them, and host tests
//! implement them with mocks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  relayboot-firmware                     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  relayboot-core (boot decision, session)│
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  relayboot-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!           ┌───────────────────┐
//!           │ relayboot-hal-    │
//!           │    rp2040         │
//!           └───────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::FirmwareFlash`] - Page-granular program memory
//! - [`bootup::BootupRegister`] - Value that survives a reset
//! - [`gpio::GpioInputs`], [`gpio::InputPin`], [`gpio::OutputPin`] - Digital I/O
//! - [`transport::Transport`] - Ack transmission and device reset
//! - [`scheduler::Scheduler`] - Cooperative task queue feeding commands
//! - [`jump::Jumper`] - Hand-off to the installed application

#![no_std]
#![deny(unsafe_code)]

pub mod bootup;
pub mod flash;
pub mod gpio;
pub mod jump;
pub mod scheduler;
pub mod transport;

// Re-export key traits at crate root for convenience
pub use bootup::BootupRegister;
pub use flash::{FirmwareFlash, FlashError};
pub use gpio::{GpioError, GpioInputs, InputPin, OutputPin, Pull};
pub use jump::Jumper;
pub use scheduler::{Scheduler, TaskContext};
pub use transport::Transport;
