//! Page staging buffer

/// Value of a byte in erased flash
pub const ERASED_BYTE: u8 = 0xFF;

/// Staging area for one flash page
///
/// Capacity is fixed at compile time by `N`, the active page size is set at
/// run time from the flash driver and must not exceed `N`.
#[derive(Debug, Clone)]
pub struct PageBuffer<const N: usize> {
    data: [u8; N],
    page_size: usize,
}

impl<const N: usize> PageBuffer<N> {
    /// Create an erased buffer for pages of `page_size` bytes
    ///
    /// Returns `None` if the page size is zero or larger than `N`.
    pub fn new(page_size: usize) -> Option<Self> {
        if page_size == 0 || page_size > N {
            return None;
        }
        Some(Self {
            data: [ERASED_BYTE; N],
            page_size,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Offset of `address` within its page
    pub fn offset_of(&self, address: u32) -> usize {
        address as usize % self.page_size
    }

    /// Whether `len` bytes at `offset` stay inside the page
    pub fn fits(&self, offset: usize, len: usize) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.page_size)
    }

    /// Copy `bytes` into the page at `offset`
    ///
    /// Returns false and leaves the buffer untouched if the bytes would
    /// run past the end of the page.
    pub fn stage(&mut self, offset: usize, bytes: &[u8]) -> bool {
        if !self.fits(offset, bytes.len()) {
            return false;
        }
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        true
    }

    /// Contents of the active page
    pub fn page(&self) -> &[u8] {
        &self.data[..self.page_size]
    }

    /// Refill the buffer with the erased value
    pub fn reset(&mut self) {
        self.data.fill(ERASED_BYTE);
    }

    /// Whether the active page holds only erased bytes
    pub fn is_erased(&self) -> bool {
        self.page().iter().all(|&b| b == ERASED_BYTE)
    }
}
