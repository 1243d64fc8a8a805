//! Application hand-off and reset

use cortex_m::peripheral::{NVIC, SCB};
use relayboot_hal::Jumper;

/// Jumps through the application's vector table
pub struct Rp2040Jumper;

impl Jumper for Rp2040Jumper {
    fn jump(&mut self, address: u32) -> ! {
        // SAFETY: the bootloader is done with every peripheral, and `address`
        // is the start of a present application image whose first two words
        // are the initial stack pointer and reset vector.
        unsafe {
            // Mask and unpend every line, the time driver alarm included
            let nvic = &*NVIC::PTR;
            nvic.icer[0].write(u32::MAX);
            nvic.icpr[0].write(u32::MAX);

            (*SCB::PTR).vtor.write(address);
            cortex_m::asm::bootload(address as *const u32)
        }
    }
}

/// Reset the chip
pub fn reboot() -> ! {
    SCB::sys_reset()
}
