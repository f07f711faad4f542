//! Error types for hardware operations.
//!
//! Output pins themselves are infallible once constructed; the errors here
//! cover building a pin from configuration.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while setting up hardware outputs.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The GPIO cannot drive an output.
    #[error("Invalid pin GPIO_{pin}: {reason}")]
    InvalidPin { pin: u8, reason: String },

    /// Hardware configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl HardwareError {
    /// Create a new invalid pin error.
    pub fn invalid_pin(pin: u8, reason: impl Into<String>) -> Self {
        Self::InvalidPin {
            pin,
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pin_error() {
        let error = HardwareError::invalid_pin(34, "input only");
        assert!(matches!(error, HardwareError::InvalidPin { pin: 34, .. }));
        assert_eq!(error.to_string(), "Invalid pin GPIO_34: input only");
    }

    #[test]
    fn test_configuration_error() {
        let error = HardwareError::configuration("pin 4 assigned twice");
        assert!(matches!(error, HardwareError::ConfigurationError { .. }));
        assert_eq!(error.to_string(), "Configuration error: pin 4 assigned twice");
    }
}
