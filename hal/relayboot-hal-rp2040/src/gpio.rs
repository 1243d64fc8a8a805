//! GPIO for config-driven pin assignment
//!
//! Wraps embassy-rp pins in the `relayboot-hal` pin traits and hands out
//! inputs by number from a [`PinBank`].

use embassy_rp::gpio::{Input, Level, Output, Pull as RpPull};
use relayboot_hal::{GpioError, GpioInputs, InputPin, OutputPin, Pull};

use crate::pins::{PinBank, PinError};

fn rp_pull(pull: Pull) -> RpPull {
    match pull {
        Pull::None => RpPull::None,
        Pull::Up => RpPull::Up,
        Pull::Down => RpPull::Down,
    }
}

impl From<PinError> for GpioError {
    fn from(e: PinError) -> Self {
        match e {
            PinError::InvalidPin => GpioError::InvalidPin,
            PinError::AlreadyTaken | PinError::NotAvailable => GpioError::PinInUse,
        }
    }
}

/// Digital input pin
pub struct Rp2040Input(Input<'static>);

impl InputPin for Rp2040Input {
    fn is_high(&self) -> bool {
        self.0.is_high()
    }
}

/// Digital output pin
pub struct Rp2040Output(Output<'static>);

impl OutputPin for Rp2040Output {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn toggle(&mut self) {
        self.0.toggle();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}

/// GPIO source backed by a [`PinBank`]
pub struct Rp2040Gpio {
    bank: PinBank,
}

impl Rp2040Gpio {
    pub fn new(bank: PinBank) -> Self {
        Self { bank }
    }

    /// Configure `pin` as a push-pull output, initially low
    pub fn configure_output(&mut self, pin: u8) -> Result<Rp2040Output, GpioError> {
        let pin = self.bank.take(pin)?;
        Ok(Rp2040Output(Output::new(pin, Level::Low)))
    }
}

impl GpioInputs for Rp2040Gpio {
    type Input = Rp2040Input;

    fn configure_input(&mut self, pin: u8, pull: Pull) -> Result<Rp2040Input, GpioError> {
        let pin = self.bank.take(pin)?;
        Ok(Rp2040Input(Input::new(pin, rp_pull(pull))))
    }
}
