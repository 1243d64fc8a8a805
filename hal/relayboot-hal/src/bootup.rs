//! Persistent bootup register
//!
//! A single value that survives a device reset but not a power loss, such
//! as a no-init RAM word. It is the only
//! channel between the running application (or a previous boot) and the
//! boot decision.

/// Durable scratch store for the bootup signal
pub trait BootupRegister {
    /// Read the stored bootup code
    fn bootup_code(&mut self) -> u64;

    /// Overwrite the stored bootup code
    fn set_bootup_code(&mut self, code: u64);

    /// Clear the stored bootup code
    fn clear(&mut self) {
        self.set_bootup_code(0);
    }
}
