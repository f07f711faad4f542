use crate::{
    Result,
    constants::{MAX_LOCK_NAME_LENGTH, MAX_SUPPORTED_LOCKS},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a lock slot in the registry (0-based).
///
/// Displayed 1-based, matching the numbering operators use on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(u8);

impl SlotId {
    /// Create a slot id from a 0-based index.
    ///
    /// # Errors
    /// Returns `Error::InvalidCommand` if the index is beyond the supported slot range.
    pub fn new(index: usize) -> Result<Self> {
        if index >= MAX_SUPPORTED_LOCKS {
            return Err(Error::InvalidCommand(format!(
                "Slot index must be below {MAX_SUPPORTED_LOCKS}, got {index}"
            )));
        }
        Ok(SlotId(index as u8))
    }

    /// Create a slot id from the 1-based number shown to operators.
    ///
    /// Returns `None` for 0 or numbers beyond the supported slot range.
    #[must_use]
    pub fn from_number(number: usize) -> Option<Self> {
        number.checked_sub(1).and_then(|index| Self::new(index).ok())
    }

    /// Get the 0-based slot index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Get the 1-based slot number.
    #[must_use]
    pub fn number(&self) -> usize {
        self.index() + 1
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Endpoint id assigned to a lock on the device-bridging protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointId(u16);

impl EndpointId {
    #[must_use]
    pub fn new(id: u16) -> Self {
        EndpointId(id)
    }

    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Service index of a lock on the accessory protocol.
///
/// Accessory services are laid out one per slot, so the index equals the slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessoryIndex(u8);

impl AccessoryIndex {
    #[must_use]
    pub fn new(index: u8) -> Self {
        AccessoryIndex(index)
    }

    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl From<SlotId> for AccessoryIndex {
    fn from(slot: SlotId) -> Self {
        AccessoryIndex(slot.0)
    }
}

impl fmt::Display for AccessoryIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External identity a protocol layer uses to address a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockIdentity {
    /// Bridged endpoint on the device-bridging protocol.
    Endpoint(EndpointId),
    /// Lock service on the accessory protocol.
    Accessory(AccessoryIndex),
}

impl fmt::Display for LockIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LockIdentity::Endpoint(id) => write!(f, "endpoint {id}"),
            LockIdentity::Accessory(index) => write!(f, "accessory {index}"),
        }
    }
}

/// Externally visible lock state.
///
/// Discriminants match the accessory protocol's current-state characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LockState {
    Unsecured = 0,
    Secured = 1,
    Jammed = 2,
    Unknown = 3,
}

impl LockState {
    /// Create a lock state from its protocol value.
    ///
    /// # Errors
    /// Returns `Error::InvalidCommand` if the value is outside 0-3.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LockState::Unsecured),
            1 => Ok(LockState::Secured),
            2 => Ok(LockState::Jammed),
            3 => Ok(LockState::Unknown),
            _ => Err(Error::InvalidCommand(format!(
                "Lock state must be 0-3, got {value}"
            ))),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Returns `true` if the lock is secured.
    #[inline]
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, LockState::Secured)
    }
}

impl From<TargetState> for LockState {
    fn from(target: TargetState) -> Self {
        match target {
            TargetState::Unsecured => LockState::Unsecured,
            TargetState::Secured => LockState::Secured,
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LockState::Unsecured => write!(f, "UNLOCKED"),
            LockState::Secured => write!(f, "LOCKED"),
            LockState::Jammed => write!(f, "JAMMED"),
            LockState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Terminal state a lock can be asked to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TargetState {
    Unsecured = 0,
    Secured = 1,
}

impl TargetState {
    /// Create a target state from its protocol value.
    ///
    /// # Errors
    /// Returns `Error::InvalidCommand` if the value is not 0 or 1.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(TargetState::Unsecured),
            1 => Ok(TargetState::Secured),
            _ => Err(Error::InvalidCommand(format!(
                "Target state must be 0 or 1, got {value}"
            ))),
        }
    }

    #[inline]
    #[must_use]
    pub fn from_locked(locked: bool) -> Self {
        if locked {
            TargetState::Secured
        } else {
            TargetState::Unsecured
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, TargetState::Secured)
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        LockState::from(*self).fmt(f)
    }
}

/// Status flags reported alongside the lock state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockFlags {
    pub jammed: bool,
    pub faulted: bool,
    pub low_battery: bool,
}

impl LockFlags {
    /// Returns `true` if the lock is jammed or faulted.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.jammed || self.faulted
    }
}

/// Display name of a lock, truncated to [`MAX_LOCK_NAME_LENGTH`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockName(String);

impl LockName {
    /// Create a lock name, trimming whitespace and truncating long input.
    #[must_use]
    pub fn new(name: &str) -> Self {
        LockName(name.trim().chars().take(MAX_LOCK_NAME_LENGTH).collect())
    }

    /// Default name for a slot that was added without one.
    #[must_use]
    pub fn default_for(slot: SlotId) -> Self {
        LockName(format!("Lock_{}", slot.number()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LockName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
