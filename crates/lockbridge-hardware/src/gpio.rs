//! Simulated GPIO output.
//!
//! Stands in for a real GPIO driver on hosts without one: it validates the
//! pin number the same way a real board would and traces every level change.

use tracing::trace;

use crate::traits::OutputPin;
use crate::types::{GpioNumber, PinLevel};
use crate::{HardwareError, Result};

/// Output pin that remembers its level and traces changes.
#[derive(Debug)]
pub struct SimulatedGpioPin {
    gpio: GpioNumber,
    level: PinLevel,
}

impl SimulatedGpioPin {
    /// Configure a GPIO as an output, driven low.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InvalidPin` if the GPIO cannot drive an output.
    pub fn new(pin: u8) -> Result<Self> {
        let gpio = GpioNumber::new(pin)?;
        trace!("{} configured as output", gpio);
        Ok(Self {
            gpio,
            level: PinLevel::Low,
        })
    }

    /// Configure one output per pin number, preserving order.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::ConfigurationError` if a pin is listed twice,
    /// otherwise the first pin configuration error.
    pub fn bank(pins: &[u8]) -> Result<Vec<Self>> {
        for (i, pin) in pins.iter().enumerate() {
            if pins[..i].contains(pin) {
                return Err(HardwareError::configuration(format!(
                    "GPIO_{pin} assigned to more than one output"
                )));
            }
        }
        pins.iter().map(|&pin| Self::new(pin)).collect()
    }

    pub fn gpio(&self) -> GpioNumber {
        self.gpio
    }
}

impl OutputPin for SimulatedGpioPin {
    fn set_level(&mut self, level: PinLevel) {
        if self.level != level {
            trace!("{} -> {}", self.gpio, level);
        }
        self.level = level;
    }

    fn level(&self) -> PinLevel {
        self.level
    }

    fn label(&self) -> String {
        self.gpio.to_string()
    }
}
