//! Serial host link
//!
//! Polls the buffered UART for command frames, drains queued acks and
//! drives the status LED. Implements the scheduler and transport sides of
//! the update loop.

use defmt::*;
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embassy_time::Instant;
use embedded_io::{Read, ReadReady, Write};
use heapless::Deque;

use relayboot_core::StatusPattern;
use relayboot_hal::{OutputPin, Scheduler, TaskContext, Transport};
use relayboot_hal_rp2040::{reboot, Rp2040Output};
use relayboot_protocol::{Ack, Command, FrameError, FrameParser, MAX_FRAME_SIZE};

/// Bytes pulled from the UART per read
const RX_CHUNK: usize = 64;

/// Room for two full ack frames
const TX_QUEUE_SIZE: usize = 2 * MAX_FRAME_SIZE;

/// UART link to the flashing host
pub struct SerialLink {
    tx: BufferedUartTx,
    rx: BufferedUartRx,
    parser: FrameParser,
    rx_buf: [u8; RX_CHUNK],
    rx_pos: usize,
    rx_len: usize,
    tx_queue: Deque<u8, TX_QUEUE_SIZE>,
    led: Option<Rp2040Output>,
}

impl SerialLink {
    pub fn new(tx: BufferedUartTx, rx: BufferedUartRx, led: Option<Rp2040Output>) -> Self {
        Self {
            tx,
            rx,
            parser: FrameParser::new(),
            rx_buf: [0u8; RX_CHUNK],
            rx_pos: 0,
            rx_len: 0,
            tx_queue: Deque::new(),
            led,
        }
    }

    /// Follow the blink pattern for the session phase
    fn update_status(&mut self, context: TaskContext) {
        if let Some(led) = &mut self.led {
            let level = StatusPattern::from_context(context).level_at(Instant::now().as_millis());
            if led.is_set_high() != level {
                led.set_state(level);
            }
        }
    }

    /// Hand queued bytes to the UART
    fn flush_tx(&mut self) {
        while !self.tx_queue.is_empty() {
            let (front, _) = self.tx_queue.as_slices();
            match self.tx.write(front) {
                Ok(n) => {
                    for _ in 0..n {
                        self.tx_queue.pop_front();
                    }
                }
                Err(e) => {
                    warn!("UART write error: {:?}", e);
                    break;
                }
            }
        }
    }

    /// Feed received bytes to the parser until a frame completes
    fn poll_rx(&mut self) -> Option<Result<Command, FrameError>> {
        loop {
            while self.rx_pos < self.rx_len {
                let byte = self.rx_buf[self.rx_pos];
                self.rx_pos += 1;

                match self.parser.feed(byte) {
                    Ok(Some(frame)) => return Some(Command::from_frame(&frame)),
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Frame parse error: {:?}", e);
                        return Some(Err(e));
                    }
                }
            }

            match self.rx.read_ready() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    warn!("UART read error: {:?}", e);
                    return None;
                }
            }

            match self.rx.read(&mut self.rx_buf) {
                Ok(n) => {
                    trace!("RX: {} bytes", n);
                    self.rx_pos = 0;
                    self.rx_len = n;
                }
                Err(e) => {
                    warn!("UART read error: {:?}", e);
                    return None;
                }
            }
        }
    }
}

impl Scheduler for SerialLink {
    fn init(&mut self) {
        self.parser.reset();
        self.tx_queue.clear();
        info!("Serial link ready");
    }

    fn run_pending_tasks(&mut self, context: TaskContext) -> Option<Result<Command, FrameError>> {
        self.update_status(context);
        self.flush_tx();
        self.poll_rx()
    }
}

impl Transport for SerialLink {
    fn send(&mut self, ack: &Ack) {
        let bytes = match ack.to_frame().and_then(|frame| frame.encode_to_vec()) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode ack: {:?}", e);
                return;
            }
        };

        if self.tx_queue.capacity() - self.tx_queue.len() < bytes.len() {
            warn!("TX queue full, dropping ack");
            return;
        }
        for &byte in bytes.iter() {
            // Space was checked above
            let _ = self.tx_queue.push_back(byte);
        }
    }

    fn tx_queue_empty(&self) -> bool {
        self.tx_queue.is_empty()
    }

    fn reboot(&mut self) -> ! {
        reboot()
    }
}
