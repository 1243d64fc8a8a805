//! Program flash driver for RP2040
//!
//! The external QSPI flash is memory mapped at [`FLASH_BASE`]. The
//! bootloader occupies the first sectors and the application follows.
//!
//! Implements the `FirmwareFlash` trait from `relayboot-hal`.

use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

pub use relayboot_hal::flash::FlashError;
use relayboot_hal::FirmwareFlash;

/// XIP address of the first flash byte
pub const FLASH_BASE: u32 = 0x1000_0000;

/// Flash size
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Flash erase size for RP2040
pub const FLASH_ERASE_SIZE: usize = ERASE_SIZE;

/// Translate an XIP address range into a flash offset
pub fn flash_offset(address: u32, len: usize) -> Result<u32, FlashError> {
    let offset = address
        .checked_sub(FLASH_BASE)
        .ok_or(FlashError::OutOfBounds)?;
    let end = offset as usize + len;
    if end > FLASH_SIZE {
        return Err(FlashError::OutOfBounds);
    }
    Ok(offset)
}

/// RP2040 program flash
pub struct Rp2040Flash<'d> {
    flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>,
}

impl<'d> Rp2040Flash<'d> {
    pub fn new(flash: Peri<'d, FLASH>) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
        }
    }
}

impl<'d> FirmwareFlash for Rp2040Flash<'d> {
    fn page_size(&self) -> u32 {
        FLASH_ERASE_SIZE as u32
    }

    fn contains(&self, address: u32, len: usize) -> bool {
        flash_offset(address, len).is_ok()
    }

    fn read_block(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let offset = flash_offset(address, buf.len())?;
        self.flash
            .blocking_read(offset, buf)
            .map_err(|_| FlashError::Read)
    }

    fn write_page(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        if address as usize % FLASH_ERASE_SIZE != 0 || data.len() != FLASH_ERASE_SIZE {
            return Err(FlashError::Unaligned);
        }
        let offset = flash_offset(address, data.len())?;

        self.flash
            .blocking_erase(offset, offset + FLASH_ERASE_SIZE as u32)
            .map_err(|_| FlashError::Erase)?;
        self.flash
            .blocking_write(offset, data)
            .map_err(|_| FlashError::Program)
    }
}
