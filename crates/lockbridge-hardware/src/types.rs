//! Common types shared by output pin implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HardwareError, Result};

/// Logic level of a digital output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinLevel {
    /// Output driven low (LED off).
    #[default]
    Low,

    /// Output driven high (LED on).
    High,
}

impl PinLevel {
    /// Level for a boolean "on" state.
    pub fn from_bool(on: bool) -> Self {
        if on { Self::High } else { Self::Low }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, Self::High)
    }

    /// The opposite level.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "OFF"),
            Self::High => write!(f, "ON"),
        }
    }
}

/// GPIO number validated as output-capable.
///
/// Follows the ESP32 pin map: GPIO 6-11 are wired to the SPI flash, 34-39
/// are input-only, and 20, 24 and 28-31 are not bonded out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GpioNumber(u8);

impl GpioNumber {
    /// Highest GPIO number on the part.
    pub const MAX: u8 = 39;

    /// Create a GPIO number, rejecting pins that cannot drive an LED.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InvalidPin` if the pin does not exist or cannot
    /// be configured as an output.
    ///
    /// # Examples
    ///
    /// ```
    /// use lockbridge_hardware::types::GpioNumber;
    ///
    /// assert!(GpioNumber::new(4).is_ok());
    /// assert!(GpioNumber::new(34).is_err());
    /// ```
    pub fn new(pin: u8) -> Result<Self> {
        let reason = match pin {
            6..=11 => Some("reserved for SPI flash"),
            20 | 24 | 28..=31 => Some("not available on this part"),
            34..=39 => Some("input only"),
            p if p > Self::MAX => Some("out of range"),
            _ => None,
        };

        match reason {
            Some(reason) => Err(HardwareError::invalid_pin(pin, reason)),
            None => Ok(Self(pin)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for GpioNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO_{}", self.0)
    }
}
