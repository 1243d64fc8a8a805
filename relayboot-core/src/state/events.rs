//! Events that trigger session state transitions

/// Handled commands, as seen by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEvent {
    /// Host identified itself
    Connect,
    /// A block was staged
    BlockWritten,
    /// A block was read back
    BlockRead,
    /// Image transfer finished
    EndOfFile,
    /// Host ended the session
    Complete,
}
