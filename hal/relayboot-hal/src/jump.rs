//! Application hand-off

/// Transfers control to an application image
///
/// Implementations relocate the vector table, load the stack pointer from
/// the first word at `address` and branch to the reset vector in the
/// second word.
pub trait Jumper {
    /// Jump to the application whose vector table starts at `address`
    fn jump(&mut self, address: u32) -> !;
}
