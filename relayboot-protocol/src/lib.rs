//! Bootloader command protocol
//!
//! This crate defines the word-oriented command protocol spoken between a
//! flashing host and the relayboot bootloader. It is transport agnostic: the
//! same frames travel over UART, USB CDC or CAN.
//!
//! # Protocol Overview
//!
//! All messages use a single binary frame format, little-endian:
//! ```text
//! ┌───────────┬──────────┬───────────┬───────────────┬──────────┬───────────┐
//! │ HEADER    │ CODE     │ WORDS     │ PAYLOAD       │ CRC16    │ TRAILER   │
//! │ 0x01 0x88 │ 2B       │ 1B        │ WORDS × 4B    │ 2B       │ 0x99 0x03 │
//! └───────────┴──────────┴───────────┴───────────────┴──────────┴───────────┘
//! ```
//!
//! Requests carry a command code, responses carry an ack code whose first
//! payload word echoes the acknowledged command.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod frame;
pub mod messages;

pub use frame::{Frame, FrameError, FrameParser, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, MAX_PAYLOAD_WORDS};
pub use messages::{Ack, Command, MAX_BLOCK_SIZE, MAX_MCU_LEN, PROTO_VERSION};
