//! Update session and command handlers
//!
//! A [`Session`] owns everything an update touches: the flash driver, the
//! page writer and the session flags. Each handler validates its arguments,
//! applies the request and returns the acknowledgement to send.
//!
//! Rejected requests produce [`Ack::CommandError`] and leave the session
//! untouched. Flash faults are returned as [`SessionError`] and end the
//! session without an acknowledgement.

use heapless::Vec;
use relayboot_hal::{FirmwareFlash, FlashError, TaskContext};
use relayboot_protocol::{Ack, Command, MAX_BLOCK_SIZE};

use crate::config::{BootConfig, ConfigError, MAX_PAGE_SIZE};
use crate::flash::{PageWriter, WriteState};
use crate::log;
use crate::state::{SessionEvent, SessionState};

/// Fatal session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    /// Program memory could not be written or finalized
    Flash(FlashError),
}

impl From<FlashError> for SessionError {
    fn from(e: FlashError) -> Self {
        SessionError::Flash(e)
    }
}

/// One firmware update session
///
/// `N` bounds the flash page size the session can stage.
pub struct Session<F, const N: usize = MAX_PAGE_SIZE> {
    config: BootConfig,
    flash: F,
    writer: PageWriter<N>,
    state: SessionState,
    in_transfer: bool,
    complete: bool,
}

impl<F: FirmwareFlash, const N: usize> Session<F, N> {
    /// Start a session, checking the configuration against the flash
    pub fn new(config: BootConfig, flash: F) -> Result<Self, ConfigError> {
        let page_size = flash.page_size();
        config.validate(page_size)?;

        let writer = PageWriter::new(page_size as usize).ok_or(ConfigError::PageTooLarge)?;

        Ok(Self {
            config,
            flash,
            writer,
            state: SessionState::Idle,
            in_transfer: false,
            complete: false,
        })
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn write_state(&self) -> WriteState {
        self.writer.state()
    }

    pub fn writer(&self) -> &PageWriter<N> {
        &self.writer
    }

    /// A block was read or written since the last end of file
    pub fn is_in_transfer(&self) -> bool {
        self.in_transfer
    }

    /// The host completed the session
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Flags exposed to background tasks
    pub fn task_context(&self) -> TaskContext {
        TaskContext {
            in_transfer: self.in_transfer,
            complete: self.complete,
        }
    }

    /// Route a decoded command to its handler
    pub fn dispatch(&mut self, command: Command) -> Result<Ack, SessionError> {
        match command {
            Command::Connect => Ok(self.connect()),
            Command::WriteBlock {
                address,
                arg_count,
                data,
            } => self.write_block(arg_count, address, &data),
            Command::ReadBlock { address } => self.read_block(address),
            Command::EndOfFile => self.end_of_file(),
            Command::Complete => Ok(self.complete()),
        }
    }

    /// Report protocol version, application start, block size and MCU
    pub fn connect(&mut self) -> Ack {
        log::info!("host connected");
        self.advance(SessionEvent::Connect);
        Ack::Connected {
            application_start: self.config.application_start,
            block_size: self.config.block_size,
            mcu: self.config.mcu,
        }
    }

    /// Stage one block at `address`
    ///
    /// `arg_count` is the number of argument words received, which must be
    /// the block's words plus the address word.
    pub fn write_block(
        &mut self,
        arg_count: usize,
        address: u32,
        data: &[u8],
    ) -> Result<Ack, SessionError> {
        if arg_count != self.config.block_words() + 1 {
            log::warn!("write rejected: {} argument words", arg_count);
            return Ok(Ack::CommandError);
        }
        if data.len() != self.config.block_size as usize {
            log::warn!("write rejected: {} byte block", data.len());
            return Ok(Ack::CommandError);
        }
        if address < self.config.application_start {
            log::warn!("write rejected: {:#x} below application", address);
            return Ok(Ack::CommandError);
        }
        if !self.flash.contains(address, data.len()) {
            log::warn!("write rejected: {:#x} outside flash", address);
            return Ok(Ack::CommandError);
        }
        if !self.writer.fits(address, data.len()) {
            log::warn!("write rejected: {:#x} crosses a page", address);
            return Ok(Ack::CommandError);
        }

        self.in_transfer = true;
        self.writer.write_bytes(&mut self.flash, address, data)?;
        self.advance(SessionEvent::BlockWritten);

        Ok(Ack::BlockReceived { address })
    }

    /// Read one block straight from flash
    ///
    /// Staged bytes that have not been committed are not visible here.
    pub fn read_block(&mut self, address: u32) -> Result<Ack, SessionError> {
        self.in_transfer = true;

        let mut buf = [0u8; MAX_BLOCK_SIZE];
        let block = &mut buf[..self.config.block_size as usize];
        if let Err(e) = self.flash.read_block(address, block) {
            log::warn!("read at {:#x} failed: {:?}", address, e);
            return Ok(Ack::CommandError);
        }

        // Block size was bounded by MAX_BLOCK_SIZE when the session started
        let data = Vec::from_slice(block).map_err(|_| FlashError::OutOfBounds)?;
        self.advance(SessionEvent::BlockRead);

        Ok(Ack::BlockData { address, data })
    }

    /// Flush the last page and finalize the image
    pub fn end_of_file(&mut self) -> Result<Ack, SessionError> {
        self.in_transfer = false;

        self.writer.flush(&mut self.flash)?;
        self.flash.complete()?;

        let pages = self.writer.pages_written(self.config.application_start);
        log::info!("image finalized, {} pages", pages);
        self.advance(SessionEvent::EndOfFile);

        Ok(Ack::EndOfFile { pages })
    }

    /// End the session
    pub fn complete(&mut self) -> Ack {
        let ack = Ack::Complete;
        self.complete = true;
        self.advance(SessionEvent::Complete);
        log::info!("session complete");
        ack
    }

    fn advance(&mut self, event: SessionEvent) {
        let next = self.state.transition(event);
        if next != self.state {
            log::debug!("session {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
