//! Bootup register in reserved RAM
//!
//! SRAM keeps its contents across a RUN pin or software reset but not
//! across a power cycle. The top [`BOOTUP_RESERVED`] bytes of the striped
//! SRAM are left out of the `RAM` region in `memory.x`, so neither the
//! runtime's `.bss`/`.data` init nor the stack touches them. Applications
//! that request update mode must reserve the same bytes.

use core::ptr;

use relayboot_hal::BootupRegister;

/// End of the striped SRAM banks 0 to 3
pub const SRAM_END: u32 = 0x2004_0000;

/// Bytes cut from the top of `RAM` for the bootup code
pub const BOOTUP_RESERVED: u32 = 16;

/// Address of the bootup code, low word first
pub const BOOTUP_CODE_ADDR: u32 = SRAM_END - BOOTUP_RESERVED;

/// Split a code into the low and high words stored in RAM
pub const fn code_to_words(code: u64) -> [u32; 2] {
    [code as u32, (code >> 32) as u32]
}

/// Join the stored low and high words
pub const fn code_from_words(words: [u32; 2]) -> u64 {
    ((words[1] as u64) << 32) | words[0] as u64
}

/// Bootup register backed by a no-init RAM word pair
pub struct RamBootup {
    words: *mut u32,
}

impl RamBootup {
    pub fn new() -> Self {
        Self {
            words: BOOTUP_CODE_ADDR as *mut u32,
        }
    }
}

impl Default for RamBootup {
    fn default() -> Self {
        Self::new()
    }
}

impl BootupRegister for RamBootup {
    fn bootup_code(&mut self) -> u64 {
        // SAFETY: the two words at BOOTUP_CODE_ADDR are reserved in memory.x
        // and only ever accessed through this register.
        let words = unsafe {
            [
                ptr::read_volatile(self.words),
                ptr::read_volatile(self.words.add(1)),
            ]
        };
        code_from_words(words)
    }

    fn set_bootup_code(&mut self, code: u64) {
        let [low, high] = code_to_words(code);
        // SAFETY: see `bootup_code`
        unsafe {
            ptr::write_volatile(self.words, low);
            ptr::write_volatile(self.words.add(1), high);
        }
    }
}
