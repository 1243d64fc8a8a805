//! Board-agnostic core logic for the relayboot bootloader
//!
//! This crate contains everything between the hardware traits and the
//! firmware binary:
//!
//! - Boot mode decision and double-reset detection
//! - Page staging buffer and the write tracker that commits it to flash
//! - Command handlers for an update session
//! - The update-mode run loop
//! - Configuration types and the status indicator pattern
//!
//! All collaborators are reached through `relayboot-hal` traits, so the
//! crate builds and tests on the host.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod boot;
pub mod config;
pub mod flash;
pub mod session;
pub mod state;
pub mod status;
pub mod update;

#[cfg(test)]
pub(crate) mod testing;

pub use boot::{request_update_mode, BootDecision, BootMode, DoubleResetDetector, EntryReason, REQUEST_SIGNATURE};
pub use config::{BootConfig, ButtonConfig, ConfigError, MAX_PAGE_SIZE};
pub use flash::{PageBuffer, PageWriter, WriteState, ERASED_BYTE};
pub use session::{Session, SessionError};
pub use state::{SessionEvent, SessionState};
pub use status::StatusPattern;
pub use update::UpdateLoop;

#[cfg(feature = "defmt")]
pub(crate) use defmt as log;

#[cfg(not(feature = "defmt"))]
pub(crate) mod log {
    macro_rules! info {
        ($($x:expr),* $(,)?) => {{ $( let _ = &$x; )* }};
    }
    macro_rules! debug {
        ($($x:expr),* $(,)?) => {{ $( let _ = &$x; )* }};
    }
    macro_rules! warner {
        ($($x:expr),* $(,)?) => {{ $( let _ = &$x; )* }};
    }
    macro_rules! error {
        ($($x:expr),* $(,)?) => {{ $( let _ = &$x; )* }};
    }

    pub(crate) use warner as warn;
    pub(crate) use {debug, error, info};
}
