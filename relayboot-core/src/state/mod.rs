//! Update session state
//!
//! Tracks where a host is in the update protocol. The state is recorded for
//! logging and status indication; every command is accepted in every state.

pub mod events;
pub mod machine;

pub use events::SessionEvent;
pub use machine::SessionState;
