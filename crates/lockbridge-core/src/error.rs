use thiserror::Error;

use crate::types::SlotId;

#[derive(Error, Debug)]
pub enum Error {
    // Registry errors
    #[error("Maximum number of locks ({capacity}) already reached")]
    CapacityExceeded { capacity: usize },

    /// Carries the 1-based lock number as the operator typed it.
    #[error("Unknown lock slot: {0}")]
    UnknownSlot(usize),

    #[error("No lock registered for {0}")]
    UnknownIdentity(String),

    #[error("Bridge endpoint ids exhausted")]
    EndpointsExhausted,

    // Lock operation errors
    #[error("Lock {slot} is busy: an operation is already in progress")]
    Busy { slot: SlotId },

    #[error("Invalid transition for lock {slot}: {reason}")]
    InvalidTransition { slot: SlotId, reason: String },

    // Command errors
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for errors caused by addressing a lock that does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UnknownSlot(_) | Error::UnknownIdentity(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
