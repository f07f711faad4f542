//! Lock emulation: status indicators, per-lock state machines and the slot registry.
//!
//! Nothing in this crate reads the wall clock or a global RNG. Every
//! time-dependent call takes `now`, and outcome draws take a
//! [`RandomSource`](lockbridge_core::RandomSource), so the whole emulator
//! can be driven step by step from tests.

pub mod indicator;
pub mod lock_unit;
pub mod registry;

pub use indicator::{IndicatorMode, IndicatorStatus, StatusIndicator};
pub use lock_unit::{LockSettings, LockSnapshot, LockUnit, Operation, OperationOutcome};
pub use registry::{LockEntry, LockRegistry};
