//! Status indicator pattern
//!
//! Maps the session flags onto an LED pattern: slow blink while waiting,
//! fast blink while blocks are moving, solid once complete.

use relayboot_hal::TaskContext;

/// LED behavior for the current session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusPattern {
    /// Toggle every `interval_ms`
    Blink { interval_ms: u32 },
    /// Steady on
    Solid,
}

impl StatusPattern {
    /// Toggle interval while waiting for the host
    pub const IDLE_INTERVAL_MS: u32 = 1000;

    /// Toggle interval during a transfer
    pub const TRANSFER_INTERVAL_MS: u32 = 100;

    pub fn from_context(context: TaskContext) -> Self {
        if context.complete {
            StatusPattern::Solid
        } else if context.in_transfer {
            StatusPattern::Blink {
                interval_ms: Self::TRANSFER_INTERVAL_MS,
            }
        } else {
            StatusPattern::Blink {
                interval_ms: Self::IDLE_INTERVAL_MS,
            }
        }
    }

    /// LED level at `now_ms` since boot
    pub fn level_at(&self, now_ms: u64) -> bool {
        match *self {
            StatusPattern::Solid => true,
            StatusPattern::Blink { interval_ms } => {
                (now_ms / u64::from(interval_ms.max(1))) % 2 == 0
            }
        }
    }
}
