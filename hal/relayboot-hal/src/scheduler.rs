//! Cooperative task queue
//!
//! The update loop owns no timers or interrupts. Each iteration it asks the
//! scheduler to run whatever background work is due (link servicing, status
//! indication, ...) and to hand back at most one decoded host command.

use relayboot_protocol::{Command, FrameError};

/// Session status visible to background tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskContext {
    /// A block was read or written since the last end of file
    pub in_transfer: bool,
    /// The host sent the completion command
    pub complete: bool,
}

/// Cooperative task scheduler
pub trait Scheduler {
    /// One-time setup before the first poll
    fn init(&mut self) {}

    /// Run pending background tasks
    ///
    /// Returns a decoded host command if one arrived, or the decode error
    /// for a frame that was received but rejected.
    fn run_pending_tasks(&mut self, context: TaskContext) -> Option<Result<Command, FrameError>>;
}
