//! Host link output

use relayboot_protocol::Ack;

/// Outbound side of the host link
pub trait Transport {
    /// Queue an acknowledgement for transmission
    ///
    /// Queuing must not block on the wire; frames that do not fit in the
    /// transmit queue may be dropped, the host retries on timeout.
    fn send(&mut self, ack: &Ack);

    /// Whether every queued byte has left the device
    fn tx_queue_empty(&self) -> bool;

    /// Reset the device
    fn reboot(&mut self) -> !;
}
