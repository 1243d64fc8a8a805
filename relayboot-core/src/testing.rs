//! Mock collaborators shared by the unit tests

use core::cell::{Cell, RefCell};
use core::ops::Range;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use relayboot_hal::{
    BootupRegister, FirmwareFlash, FlashError, GpioError, GpioInputs, InputPin, Pull, Scheduler,
    TaskContext, Transport,
};
use relayboot_protocol::{Ack, Command, FrameError};

use crate::flash::ERASED_BYTE;

/// Flash backed by a byte vector, recording every page commit
pub(crate) struct MockFlash {
    base: u32,
    memory: Vec<u8>,
    page_size: u32,
    pub commits: Vec<(u32, Vec<u8>)>,
    pub completes: usize,
    pub fail_program: bool,
}

impl MockFlash {
    /// Erased flash covering `[base, base + size)`
    pub fn new(base: u32, size: usize, page_size: u32) -> Self {
        Self {
            base,
            memory: vec![ERASED_BYTE; size],
            page_size,
            commits: Vec::new(),
            completes: 0,
            fail_program: false,
        }
    }

    /// Place non-erased bytes at `address`
    pub fn preload(&mut self, address: u32, bytes: &[u8]) {
        let range = self.range(address, bytes.len()).unwrap();
        self.memory[range].copy_from_slice(bytes);
    }

    pub fn memory_at(&self, address: u32, len: usize) -> &[u8] {
        let range = self.range(address, len).unwrap();
        &self.memory[range]
    }

    fn range(&self, address: u32, len: usize) -> Result<Range<usize>, FlashError> {
        let start = address
            .checked_sub(self.base)
            .ok_or(FlashError::OutOfBounds)? as usize;
        let end = start + len;
        if end > self.memory.len() {
            return Err(FlashError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl FirmwareFlash for MockFlash {
    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn contains(&self, address: u32, len: usize) -> bool {
        self.range(address, len).is_ok()
    }

    fn read_block(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let range = self.range(address, buf.len()).map_err(|_| FlashError::Read)?;
        buf.copy_from_slice(&self.memory[range]);
        Ok(())
    }

    fn write_page(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        if address % self.page_size != 0 || data.len() != self.page_size as usize {
            return Err(FlashError::Unaligned);
        }
        if self.fail_program {
            return Err(FlashError::Program);
        }
        let range = self.range(address, data.len())?;
        self.memory[range].copy_from_slice(data);
        self.commits.push((address, data.to_vec()));
        Ok(())
    }

    fn complete(&mut self) -> Result<(), FlashError> {
        self.completes += 1;
        Ok(())
    }
}

/// Ordered record of register writes and delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraceEvent {
    SetCode(u64),
    DelayUs(u32),
    DelayMs(u32),
}

#[derive(Clone, Default)]
pub(crate) struct Trace(Rc<RefCell<Vec<TraceEvent>>>);

impl Trace {
    fn push(&self, event: TraceEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.0.borrow().clone()
    }
}

pub(crate) struct MockBootup {
    pub code: u64,
    trace: Trace,
}

impl MockBootup {
    pub fn new(code: u64, trace: &Trace) -> Self {
        Self {
            code,
            trace: trace.clone(),
        }
    }
}

impl BootupRegister for MockBootup {
    fn bootup_code(&mut self) -> u64 {
        self.code
    }

    fn set_bootup_code(&mut self, code: u64) {
        self.trace.push(TraceEvent::SetCode(code));
        self.code = code;
    }
}

pub(crate) struct MockDelay {
    trace: Trace,
}

impl MockDelay {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
        }
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.trace.push(TraceEvent::DelayUs(ns / 1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.trace.push(TraceEvent::DelayUs(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.trace.push(TraceEvent::DelayMs(ms));
    }
}

pub(crate) struct MockPin {
    high: bool,
}

impl InputPin for MockPin {
    fn is_high(&self) -> bool {
        self.high
    }
}

/// GPIO source whose pins all read `level`
pub(crate) struct MockGpio {
    pub level: bool,
    pub fail: bool,
    pub configured: Vec<(u8, Pull)>,
}

impl MockGpio {
    pub fn new(level: bool) -> Self {
        Self {
            level,
            fail: false,
            configured: Vec::new(),
        }
    }
}

impl GpioInputs for MockGpio {
    type Input = MockPin;

    fn configure_input(&mut self, pin: u8, pull: Pull) -> Result<MockPin, GpioError> {
        if self.fail {
            return Err(GpioError::InvalidPin);
        }
        self.configured.push((pin, pull));
        Ok(MockPin { high: self.level })
    }
}

/// Host link that replays scripted commands and records acks
#[derive(Default)]
pub(crate) struct MockLink {
    pub incoming: VecDeque<Result<Command, FrameError>>,
    pub sent: Vec<Ack>,
    pub contexts: Vec<TaskContext>,
    pub inits: usize,
    /// Number of `tx_queue_empty` calls that report pending bytes
    pub tx_busy_polls: Cell<usize>,
}

impl MockLink {
    pub fn with_commands(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            incoming: commands.into_iter().map(Ok).collect(),
            ..Self::default()
        }
    }
}

impl Scheduler for MockLink {
    fn init(&mut self) {
        self.inits += 1;
    }

    fn run_pending_tasks(&mut self, context: TaskContext) -> Option<Result<Command, FrameError>> {
        self.contexts.push(context);
        self.incoming.pop_front()
    }
}

impl Transport for MockLink {
    fn send(&mut self, ack: &Ack) {
        self.sent.push(ack.clone());
    }

    fn tx_queue_empty(&self) -> bool {
        let busy = self.tx_busy_polls.get();
        if busy == 0 {
            return true;
        }
        self.tx_busy_polls.set(busy - 1);
        false
    }

    fn reboot(&mut self) -> ! {
        panic!("reboot");
    }
}
