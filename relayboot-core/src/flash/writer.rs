//! Write state tracker
//!
//! Owns the page buffer and decides when staged data is programmed. At most
//! one page is open at a time: data for a new page is only accepted after
//! the previous one has been committed.

use relayboot_hal::{FirmwareFlash, FlashError};

use super::buffer::PageBuffer;
use crate::log;

/// Page-level write progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WriteState {
    /// Base address of the most recently committed page
    pub last_page_address: Option<u32>,
    /// The buffer holds bytes not yet programmed
    pub page_pending: bool,
}

/// Turns a stream of blocks into page-aligned flash writes
#[derive(Debug, Clone)]
pub struct PageWriter<const N: usize> {
    buffer: PageBuffer<N>,
    state: WriteState,
    /// Base address of the pending page
    open_page: Option<u32>,
}

impl<const N: usize> PageWriter<N> {
    /// Create a writer for pages of `page_size` bytes
    ///
    /// Returns `None` if the page size does not fit the buffer.
    pub fn new(page_size: usize) -> Option<Self> {
        Some(Self {
            buffer: PageBuffer::new(page_size)?,
            state: WriteState::default(),
            open_page: None,
        })
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn buffer(&self) -> &PageBuffer<N> {
        &self.buffer
    }

    pub fn page_size(&self) -> u32 {
        self.buffer.page_size() as u32
    }

    /// Base address of the page containing `address`
    pub fn page_base(&self, address: u32) -> u32 {
        address - self.buffer.offset_of(address) as u32
    }

    /// Whether `len` bytes at `address` stay inside one page
    pub fn fits(&self, address: u32, len: usize) -> bool {
        self.buffer.fits(self.buffer.offset_of(address), len)
    }

    /// Stage `bytes` at `address`, committing the page when it fills
    ///
    /// A pending page at a different base is committed first. The caller
    /// guarantees the bytes stay within one page (see [`Self::fits`]).
    ///
    /// Returns the base address of the page committed because this write
    /// completed it.
    pub fn write_bytes<F: FirmwareFlash>(
        &mut self,
        flash: &mut F,
        address: u32,
        bytes: &[u8],
    ) -> Result<Option<u32>, FlashError> {
        let base = self.page_base(address);
        let offset = self.buffer.offset_of(address);

        if !self.buffer.fits(offset, bytes.len()) {
            return Err(FlashError::OutOfBounds);
        }

        if let Some(open) = self.open_page {
            if open != base && self.state.page_pending {
                log::debug!("page {:#x} left open, committing", open);
                self.commit(flash, open)?;
            }
        }

        self.buffer.stage(offset, bytes);
        self.state.page_pending = true;
        self.open_page = Some(base);

        if offset + bytes.len() == self.buffer.page_size() {
            self.commit(flash, base)?;
            return Ok(Some(base));
        }
        Ok(None)
    }

    /// Commit the pending page, full or not
    ///
    /// Bytes that were never written keep the erased value. Returns the base
    /// address of the committed page, or `None` if nothing was pending.
    pub fn flush<F: FirmwareFlash>(&mut self, flash: &mut F) -> Result<Option<u32>, FlashError> {
        match self.open_page {
            Some(base) if self.state.page_pending => {
                self.commit(flash, base)?;
                Ok(Some(base))
            }
            _ => Ok(None),
        }
    }

    /// Number of pages from `start` through the last committed page
    pub fn pages_written(&self, start: u32) -> u32 {
        match self.state.last_page_address {
            Some(last) => last.saturating_sub(start) / self.page_size() + 1,
            None => 0,
        }
    }

    fn commit<F: FirmwareFlash>(&mut self, flash: &mut F, base: u32) -> Result<(), FlashError> {
        if let Err(e) = flash.write_page(base, self.buffer.page()) {
            log::error!("page write at {:#x} failed: {:?}", base, e);
            return Err(e);
        }
        log::debug!("committed page {:#x}", base);

        self.buffer.reset();
        self.state.last_page_address = Some(base);
        self.state.page_pending = false;
        self.open_page = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::ERASED_BYTE;
    use crate::testing::MockFlash;
    use proptest::prelude::*;
    use std::vec::Vec;

    const START: u32 = 0x8000;

    fn setup() -> (PageWriter<256>, MockFlash) {
        (
            PageWriter::new(256).unwrap(),
            MockFlash::new(START, 0x1000, 256),
        )
    }

    #[test]
    fn test_partial_page_stays_pending() {
        let (mut writer, mut flash) = setup();

        let committed = writer.write_bytes(&mut flash, 0x8000, &[0x11; 64]).unwrap();
        assert_eq!(committed, None);
        assert!(flash.commits.is_empty());
        assert_eq!(
            writer.state(),
            WriteState {
                last_page_address: None,
                page_pending: true
            }
        );
    }

    #[test]
    fn test_full_page_commits_once() {
        let (mut writer, mut flash) = setup();

        for (i, address) in [0x8000u32, 0x8040, 0x8080].into_iter().enumerate() {
            let result = writer.write_bytes(&mut flash, address, &[i as u8; 64]);
            assert_eq!(result, Ok(None));
        }
        assert!(flash.commits.is_empty());

        let result = writer.write_bytes(&mut flash, 0x80C0, &[3; 64]);
        assert_eq!(result, Ok(Some(0x8000)));
        assert_eq!(flash.commits.len(), 1);

        let (address, data) = &flash.commits[0];
        assert_eq!(*address, 0x8000);
        for i in 0..4 {
            assert!(data[i * 64..(i + 1) * 64].iter().all(|&b| b == i as u8));
        }

        assert!(writer.buffer().is_erased());
        assert_eq!(
            writer.state(),
            WriteState {
                last_page_address: Some(0x8000),
                page_pending: false
            }
        );
    }

    #[test]
    fn test_out_of_order_offsets_within_page() {
        let (mut writer, mut flash) = setup();

        writer.write_bytes(&mut flash, 0x8080, &[2; 64]).unwrap();
        writer.write_bytes(&mut flash, 0x8000, &[0; 64]).unwrap();
        writer.write_bytes(&mut flash, 0x8040, &[1; 64]).unwrap();
        assert!(flash.commits.is_empty());

        writer.flush(&mut flash).unwrap();
        let data = &flash.commits[0].1;
        assert_eq!(data[0x00], 0);
        assert_eq!(data[0x40], 1);
        assert_eq!(data[0x80], 2);
        assert_eq!(data[0xC0], ERASED_BYTE);
    }

    #[test]
    fn test_flush_partial_page() {
        let (mut writer, mut flash) = setup();

        writer.write_bytes(&mut flash, 0x8000, &[0xAB; 64]).unwrap();
        assert_eq!(writer.flush(&mut flash), Ok(Some(0x8000)));

        let (address, data) = &flash.commits[0];
        assert_eq!(*address, 0x8000);
        assert!(data[..64].iter().all(|&b| b == 0xAB));
        assert!(data[64..].iter().all(|&b| b == ERASED_BYTE));
        assert_eq!(writer.pages_written(START), 1);
    }

    #[test]
    fn test_flush_after_full_page_commits_next_page() {
        let (mut writer, mut flash) = setup();

        for i in 0..5u32 {
            writer
                .write_bytes(&mut flash, START + i * 64, &[0x55; 64])
                .unwrap();
        }
        assert_eq!(flash.commits.len(), 1);

        assert_eq!(writer.flush(&mut flash), Ok(Some(0x8100)));
        assert_eq!(flash.commits.len(), 2);
        assert_eq!(writer.pages_written(START), 2);
    }

    #[test]
    fn test_flush_with_nothing_pending() {
        let (mut writer, mut flash) = setup();
        assert_eq!(writer.flush(&mut flash), Ok(None));
        assert!(flash.commits.is_empty());
        assert_eq!(writer.pages_written(START), 0);
    }

    #[test]
    fn test_new_page_commits_pending_page_first() {
        let (mut writer, mut flash) = setup();

        writer.write_bytes(&mut flash, 0x8000, &[1; 64]).unwrap();
        writer.write_bytes(&mut flash, 0x8200, &[2; 64]).unwrap();

        assert_eq!(flash.commits.len(), 1);
        assert_eq!(flash.commits[0].0, 0x8000);
        assert!(writer.state().page_pending);

        // The new page does not inherit bytes from the old one
        writer.flush(&mut flash).unwrap();
        let data = &flash.commits[1].1;
        assert!(data[..64].iter().all(|&b| b == 2));
        assert!(data[64..].iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn test_write_crossing_page_rejected() {
        let (mut writer, mut flash) = setup();

        assert!(!writer.fits(0x80E0, 64));
        assert_eq!(
            writer.write_bytes(&mut flash, 0x80E0, &[0; 64]),
            Err(FlashError::OutOfBounds)
        );
        assert_eq!(writer.state(), WriteState::default());
        assert!(writer.buffer().is_erased());
    }

    #[test]
    fn test_failed_commit_keeps_page_pending() {
        let (mut writer, mut flash) = setup();
        flash.fail_program = true;

        writer.write_bytes(&mut flash, 0x8000, &[7; 64]).unwrap();
        assert_eq!(writer.flush(&mut flash), Err(FlashError::Program));

        assert!(writer.state().page_pending);
        assert_eq!(writer.state().last_page_address, None);
        assert!(!writer.buffer().is_erased());
    }

    #[test]
    fn test_pages_written_contiguous() {
        let (mut writer, mut flash) = setup();

        // Two and a half pages
        for i in 0..10u32 {
            writer
                .write_bytes(&mut flash, START + i * 64, &[i as u8; 64])
                .unwrap();
        }
        writer.flush(&mut flash).unwrap();

        assert_eq!(flash.commits.len(), 3);
        assert_eq!(writer.pages_written(START), 3);
    }

    proptest! {
        #[test]
        fn written_blocks_read_back(
            blocks in proptest::collection::vec((0u32..64, any::<[u8; 16]>()), 1..24)
        ) {
            let mut writer = PageWriter::<256>::new(256).unwrap();
            let mut flash = MockFlash::new(START, 0x1000, 256);

            // Sort by address so pages are visited in increasing order
            let mut blocks: Vec<_> = blocks;
            blocks.sort_by_key(|(index, _)| *index);
            blocks.dedup_by_key(|(index, _)| *index);

            for (index, data) in &blocks {
                writer.write_bytes(&mut flash, START + index * 16, data).unwrap();
            }
            writer.flush(&mut flash).unwrap();

            for (index, data) in &blocks {
                prop_assert_eq!(flash.memory_at(START + index * 16, 16), &data[..]);
            }
        }
    }
}
