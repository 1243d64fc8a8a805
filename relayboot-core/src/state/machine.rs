//! Session state machine definition

use super::events::SessionEvent;

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// Update mode entered, nothing received yet
    #[default]
    Idle,
    /// Host connected
    Connected,
    /// Blocks are being written or read
    Transferring,
    /// End of file received, image finalized
    Finalizing,
    /// Session complete, waiting for the reset
    Completed,
}

impl SessionState {
    /// Check if blocks are moving
    pub fn is_transferring(&self) -> bool {
        matches!(self, SessionState::Transferring)
    }

    /// Check if the session has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: SessionEvent) -> Self {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            // Nothing leaves Completed
            (Completed, _) => Completed,

            (Idle, Connect) => Connected,
            // Connect is informational once past Idle
            (state, Connect) => state,

            // Verification reads or a rewrite after EOF resume the transfer
            (_, BlockWritten) | (_, BlockRead) => Transferring,

            (_, EndOfFile) => Finalizing,

            (_, Complete) => Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_session_flow() {
        let state = SessionState::Idle;

        let state = state.transition(SessionEvent::Connect);
        assert_eq!(state, SessionState::Connected);

        let state = state.transition(SessionEvent::BlockWritten);
        assert_eq!(state, SessionState::Transferring);
        assert!(state.is_transferring());

        let state = state.transition(SessionEvent::BlockRead);
        assert_eq!(state, SessionState::Transferring);

        let state = state.transition(SessionEvent::EndOfFile);
        assert_eq!(state, SessionState::Finalizing);

        let state = state.transition(SessionEvent::Complete);
        assert_eq!(state, SessionState::Completed);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_write_without_connect() {
        let state = SessionState::Idle.transition(SessionEvent::BlockWritten);
        assert_eq!(state, SessionState::Transferring);
    }

    #[test]
    fn test_connect_does_not_rewind() {
        let states = [
            SessionState::Connected,
            SessionState::Transferring,
            SessionState::Finalizing,
        ];

        for state in states {
            assert_eq!(state.transition(SessionEvent::Connect), state);
        }
    }

    #[test]
    fn test_completed_is_terminal() {
        let events = [
            SessionEvent::Connect,
            SessionEvent::BlockWritten,
            SessionEvent::BlockRead,
            SessionEvent::EndOfFile,
            SessionEvent::Complete,
        ];

        for event in events {
            let next = SessionState::Completed.transition(event);
            assert_eq!(next, SessionState::Completed);
        }
    }

    #[test]
    fn test_read_after_eof_resumes_transfer() {
        let state = SessionState::Finalizing.transition(SessionEvent::BlockRead);
        assert_eq!(state, SessionState::Transferring);
    }
}
