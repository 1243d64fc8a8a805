//! Update-mode run loop
//!
//! Pumps the scheduler, hands each received command to the session and
//! queues the acknowledgement. Once the session is complete and the
//! transmit queue has drained, waits briefly and resets the device.

use embedded_hal::delay::DelayNs;
use relayboot_hal::{FirmwareFlash, Scheduler, Transport};
use relayboot_protocol::Ack;

use crate::config::MAX_PAGE_SIZE;
use crate::log;
use crate::session::{Session, SessionError};

/// Terminal control loop of update mode
pub struct UpdateLoop<F, const N: usize = MAX_PAGE_SIZE> {
    session: Session<F, N>,
}

impl<F: FirmwareFlash, const N: usize> UpdateLoop<F, N> {
    pub fn new(session: Session<F, N>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<F, N> {
        &self.session
    }

    /// One scheduler pass
    ///
    /// Returns true once the session is complete and every queued byte has
    /// been sent.
    pub fn poll<L: Scheduler + Transport>(&mut self, link: &mut L) -> Result<bool, SessionError> {
        let context = self.session.task_context();

        if let Some(received) = link.run_pending_tasks(context) {
            let ack = match received {
                Ok(command) => self.session.dispatch(command)?,
                Err(e) => {
                    log::warn!("undecodable frame: {:?}", e);
                    Ack::Error
                }
            };
            link.send(&ack);
        }

        Ok(self.session.is_complete() && link.tx_queue_empty())
    }

    /// Initialize the scheduler and poll until the session is done
    pub fn run_until_complete<L: Scheduler + Transport>(
        &mut self,
        link: &mut L,
    ) -> Result<(), SessionError> {
        link.init();
        while !self.poll(link)? {}
        Ok(())
    }

    /// Run the session, then reset the device
    ///
    /// Only returns if the session hit a fatal error.
    pub fn run<L, D>(mut self, link: &mut L, delay: &mut D) -> SessionError
    where
        L: Scheduler + Transport,
        D: DelayNs,
    {
        if let Err(e) = self.run_until_complete(link) {
            log::error!("update aborted: {:?}", e);
            return e;
        }

        log::info!("rebooting");
        delay.delay_ms(self.session.config().reboot_delay_ms);
        link.reboot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BootConfig;
    use crate::testing::{MockDelay, MockFlash, MockLink, Trace, TraceEvent};
    use relayboot_hal::{FlashError, TaskContext};
    use relayboot_protocol::{Command, FrameError};
    use std::vec;

    const START: u32 = 0x8000;

    fn update_loop() -> UpdateLoop<MockFlash, 256> {
        let config = BootConfig::new(START, 64, "test").with_reboot_delay_ms(100);
        let session = Session::new(config, MockFlash::new(START, 0x1000, 256)).unwrap();
        UpdateLoop::new(session)
    }

    fn full_session() -> MockLink {
        let mut commands = vec![Command::Connect];
        for i in 0..4u32 {
            commands.push(Command::write_block(START + i * 64, &[i as u8; 64]).unwrap());
        }
        commands.push(Command::EndOfFile);
        commands.push(Command::Complete);
        MockLink::with_commands(commands)
    }

    #[test]
    fn test_idle_poll_sends_nothing() {
        let mut update = update_loop();
        let mut link = MockLink::default();

        assert_eq!(update.poll(&mut link), Ok(false));
        assert!(link.sent.is_empty());
    }

    #[test]
    fn test_full_session() {
        let mut update = update_loop();
        let mut link = full_session();

        assert_eq!(update.run_until_complete(&mut link), Ok(()));

        assert_eq!(link.inits, 1);
        assert_eq!(link.sent.len(), 7);
        assert!(link.sent.iter().all(|ack| ack.is_success()));
        assert_eq!(link.sent[5], Ack::EndOfFile { pages: 1 });
        assert_eq!(link.sent[6], Ack::Complete);

        let flash = update.session().flash();
        assert_eq!(flash.commits.len(), 1);
        assert_eq!(flash.commits[0].0, START);
    }

    #[test]
    fn test_context_tracks_transfer() {
        let mut update = update_loop();
        let mut link = full_session();

        update.run_until_complete(&mut link).unwrap();

        // Context is sampled before each command is handled
        assert!(!link.contexts[1].in_transfer);
        assert!(link.contexts[2].in_transfer);
        assert!(!link.contexts[6].in_transfer);
        assert_eq!(
            update.session().task_context(),
            TaskContext {
                in_transfer: false,
                complete: true
            }
        );
    }

    #[test]
    fn test_waits_for_tx_drain() {
        let mut update = update_loop();
        let mut link = MockLink::with_commands([Command::Complete]);
        link.tx_busy_polls.set(3);

        assert_eq!(update.poll(&mut link), Ok(false));
        assert_eq!(update.poll(&mut link), Ok(false));
        assert_eq!(update.poll(&mut link), Ok(false));
        assert_eq!(update.poll(&mut link), Ok(true));
    }

    #[test]
    fn test_undecodable_frame_gets_error_ack() {
        let mut update = update_loop();
        let mut link = MockLink::default();
        link.incoming.push_back(Err(FrameError::UnknownCommand(0x42)));

        assert_eq!(update.poll(&mut link), Ok(false));
        assert_eq!(link.sent, vec![Ack::Error]);
    }

    #[test]
    fn test_command_error_keeps_running() {
        let mut update = update_loop();
        let mut link = MockLink::with_commands([
            Command::write_block(0x1000, &[0; 64]).unwrap(),
            Command::Complete,
        ]);

        update.run_until_complete(&mut link).unwrap();
        assert_eq!(link.sent, vec![Ack::CommandError, Ack::Complete]);
    }

    #[test]
    fn test_flash_fault_stops_loop_without_ack() {
        let config = BootConfig::new(START, 64, "test");
        let mut flash = MockFlash::new(START, 0x1000, 256);
        flash.fail_program = true;
        let update = UpdateLoop::<_, 256>::new(Session::new(config, flash).unwrap());

        let mut link = full_session();
        let trace = Trace::default();
        let mut delay = MockDelay::new(&trace);

        let error = update.run(&mut link, &mut delay);
        assert_eq!(error, SessionError::Flash(FlashError::Program));

        // Connect and three staged blocks were acked, the failing fourth was not
        assert_eq!(link.sent.len(), 4);
        assert!(trace.events().is_empty());
    }

    #[test]
    #[should_panic(expected = "reboot")]
    fn test_run_reboots_after_complete() {
        let update = update_loop();
        let mut link = full_session();
        let trace = Trace::default();

        update.run(&mut link, &mut MockDelay::new(&trace));
    }

    #[test]
    fn test_reboot_delay_precedes_reboot() {
        let update = update_loop();
        let mut link = full_session();
        let trace = Trace::default();
        let mut delay = MockDelay::new(&trace);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            update.run(&mut link, &mut delay);
        }));

        assert!(result.is_err());
        assert_eq!(trace.events(), vec![TraceEvent::DelayMs(100)]);
    }
}
