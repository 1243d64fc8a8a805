//! Message types for the bootloader command protocol
//!
//! Message types are divided into two categories:
//! - Host → Bootloader: commands
//! - Bootloader → Host: acknowledgements

use heapless::Vec;

use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE, MAX_PAYLOAD_WORDS};

// Command codes: Host → Bootloader
pub const CMD_CONNECT: u16 = 0x11;
pub const CMD_RX_BLOCK: u16 = 0x12;
pub const CMD_RX_EOF: u16 = 0x13;
pub const CMD_REQ_BLOCK: u16 = 0x14;
pub const CMD_COMPLETE: u16 = 0x15;

// Ack codes: Bootloader → Host
pub const ACK_SUCCESS: u16 = 0xA0;
pub const ACK_ERROR: u16 = 0xF0;
pub const ACK_COMMAND_ERROR: u16 = 0xF1;

/// Protocol version reported by CONNECT (major.minor.patch as 0x00MMmmpp)
pub const PROTO_VERSION: u32 = 0x0001_0000;

/// Largest block size a frame can carry alongside its address word
pub const MAX_BLOCK_SIZE: usize = 64;

/// Longest MCU identifier that fits in a CONNECT response
pub const MAX_MCU_LEN: usize = (MAX_PAYLOAD_WORDS - CONNECT_FIXED_WORDS) * 4;

/// Echo, version, application start, block size
const CONNECT_FIXED_WORDS: usize = 4;

/// Commands parsed from host-originated frames
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Query protocol version, application start, block size and MCU
    Connect,
    /// Stage one block of image data at `address`
    ///
    /// `arg_count` is the raw number of argument words in the frame. It is
    /// kept so the handler can reject malformed requests itself.
    WriteBlock {
        address: u32,
        arg_count: usize,
        data: Vec<u8, MAX_PAYLOAD_SIZE>,
    },
    /// Read one block back from program memory
    ReadBlock { address: u32 },
    /// No more blocks follow
    EndOfFile,
    /// Session finished, reboot into the application
    Complete,
}

impl Command {
    /// Wire code of this command
    pub fn code(&self) -> u16 {
        match self {
            Command::Connect => CMD_CONNECT,
            Command::WriteBlock { .. } => CMD_RX_BLOCK,
            Command::ReadBlock { .. } => CMD_REQ_BLOCK,
            Command::EndOfFile => CMD_RX_EOF,
            Command::Complete => CMD_COMPLETE,
        }
    }

    /// Parse a command from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.code {
            CMD_CONNECT => Ok(Command::Connect),
            CMD_RX_BLOCK => {
                // An address-less block still decodes; the handler rejects
                // it on the argument count.
                let address = frame.word(0).unwrap_or(0);
                let mut data = Vec::new();
                data.extend_from_slice(frame.bytes_from_word(1))
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                Ok(Command::WriteBlock {
                    address,
                    arg_count: frame.word_count(),
                    data,
                })
            }
            CMD_REQ_BLOCK => {
                let address = frame.word(0).ok_or(FrameError::InvalidFrame)?;
                Ok(Command::ReadBlock { address })
            }
            CMD_RX_EOF => Ok(Command::EndOfFile),
            CMD_COMPLETE => Ok(Command::Complete),
            other => Err(FrameError::UnknownCommand(other)),
        }
    }

    /// Encode this command into a frame (host side and tests)
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            Command::Connect => Ok(Frame::empty(CMD_CONNECT)),
            Command::WriteBlock { address, data, .. } => {
                let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
                payload
                    .extend_from_slice(&address.to_le_bytes())
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                payload
                    .extend_from_slice(data)
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                Frame::new(CMD_RX_BLOCK, &payload)
            }
            Command::ReadBlock { address } => Frame::from_words(CMD_REQ_BLOCK, &[*address]),
            Command::EndOfFile => Ok(Frame::empty(CMD_RX_EOF)),
            Command::Complete => Ok(Frame::empty(CMD_COMPLETE)),
        }
    }

    /// Build a well-formed write request for `data`
    pub fn write_block(address: u32, data: &[u8]) -> Result<Self, FrameError> {
        if data.len() % 4 != 0 {
            return Err(FrameError::InvalidFrame);
        }
        let mut buf = Vec::new();
        buf.extend_from_slice(data)
            .map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Command::WriteBlock {
            address,
            arg_count: 1 + data.len() / 4,
            data: buf,
        })
    }
}

/// Acknowledgements sent back to the host
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// CONNECT response
    Connected {
        application_start: u32,
        block_size: u32,
        mcu: &'static str,
    },
    /// REQ_BLOCK response with the raw block contents
    BlockData {
        address: u32,
        data: Vec<u8, MAX_BLOCK_SIZE>,
    },
    /// RX_BLOCK response echoing the staged address
    BlockReceived { address: u32 },
    /// RX_EOF response with the number of pages written
    EndOfFile { pages: u32 },
    /// COMPLETE response
    Complete,
    /// Request was well framed but its arguments were rejected
    CommandError,
    /// Request could not be decoded at all
    Error,
}

impl Ack {
    /// Check if this is a success acknowledgement
    pub fn is_success(&self) -> bool {
        !matches!(self, Ack::CommandError | Ack::Error)
    }

    /// Command code this ack answers (None for error acks)
    pub fn acked_command(&self) -> Option<u16> {
        match self {
            Ack::Connected { .. } => Some(CMD_CONNECT),
            Ack::BlockData { .. } => Some(CMD_REQ_BLOCK),
            Ack::BlockReceived { .. } => Some(CMD_RX_BLOCK),
            Ack::EndOfFile { .. } => Some(CMD_RX_EOF),
            Ack::Complete => Some(CMD_COMPLETE),
            Ack::CommandError | Ack::Error => None,
        }
    }

    /// Encode this ack into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let echo = match self.acked_command() {
            Some(code) => code as u32,
            None if matches!(self, Ack::CommandError) => return Ok(Frame::empty(ACK_COMMAND_ERROR)),
            None => return Ok(Frame::empty(ACK_ERROR)),
        };

        let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        push_word(&mut payload, echo)?;

        match self {
            Ack::Connected {
                application_start,
                block_size,
                mcu,
            } => {
                push_word(&mut payload, PROTO_VERSION)?;
                push_word(&mut payload, *application_start)?;
                push_word(&mut payload, *block_size)?;
                // Identifier is NUL padded up to a word boundary
                let bytes = mcu.as_bytes();
                payload
                    .extend_from_slice(bytes)
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                while payload.len() % 4 != 0 {
                    payload.push(0).map_err(|_| FrameError::PayloadTooLarge)?;
                }
            }
            Ack::BlockData { address, data } => {
                push_word(&mut payload, *address)?;
                payload
                    .extend_from_slice(data)
                    .map_err(|_| FrameError::PayloadTooLarge)?;
            }
            Ack::BlockReceived { address } => push_word(&mut payload, *address)?,
            Ack::EndOfFile { pages } => push_word(&mut payload, *pages)?,
            Ack::Complete | Ack::CommandError | Ack::Error => {}
        }

        Frame::new(ACK_SUCCESS, &payload)
    }
}

fn push_word(payload: &mut Vec<u8, MAX_PAYLOAD_SIZE>, word: u32) -> Result<(), FrameError> {
    payload
        .extend_from_slice(&word.to_le_bytes())
        .map_err(|_| FrameError::PayloadTooLarge)
}
