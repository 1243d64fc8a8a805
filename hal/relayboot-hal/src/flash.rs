//! Program memory abstractions
//!
//! The bootloader only ever programs whole erase pages, so the driver
//! contract is page-granular for writes and block-granular for reads.

/// Errors from flash operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Page erase failed
    Erase,
    /// Page program failed
    Program,
    /// Read failed
    Read,
    /// Address is not aligned to a page
    Unaligned,
    /// Address range lies outside program memory
    OutOfBounds,
}

/// Program memory driver
///
/// Addresses are absolute CPU addresses, as seen by the host in the
/// protocol.
pub trait FirmwareFlash {
    /// Size of one erase page in bytes
    ///
    /// This is the unit written by [`FirmwareFlash::write_page`].
    fn page_size(&self) -> u32;

    /// Whether `[address, address + len)` lies in program memory
    fn contains(&self, address: u32, len: usize) -> bool;

    /// Read `buf.len()` bytes starting at `address`
    fn read_block(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError>;

    /// Erase and program one full page
    ///
    /// `address` must be page aligned and `data` exactly one page long.
    fn write_page(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError>;

    /// Finalize the image after the last page
    ///
    /// Drivers that need nothing here (most do) keep the default.
    fn complete(&mut self) -> Result<(), FlashError> {
        Ok(())
    }
}
