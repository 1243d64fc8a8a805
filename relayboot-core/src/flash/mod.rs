//! Page staging and commit tracking
//!
//! Blocks arrive smaller than a flash page. They are staged in a
//! [`PageBuffer`] and the [`PageWriter`] decides when a page is complete
//! and must be programmed.

pub mod buffer;
pub mod writer;

pub use buffer::{PageBuffer, ERASED_BYTE};
pub use writer::{PageWriter, WriteState};
