//! Core constants for the lock bridge.
//!
//! This module collects the fixed values shared by the registry, the per-lock
//! state machine and the status indicators. Values that operators may want to
//! tune are exposed again through [`BridgeConfig`](crate::BridgeConfig), which
//! uses these constants as its defaults.
//!
//! # Usage
//!
//! ```
//! use lockbridge_core::constants::*;
//!
//! // Operation time for the third lock (slot index 2)
//! let duration = DEFAULT_BASE_DURATION_MS + 2 * DEFAULT_PER_SLOT_INCREMENT_MS;
//! assert_eq!(duration, 2100);
//!
//! // Jam blinks faster than low battery
//! assert!(JAM_BLINK_HALF_PERIOD_MS < LOW_BATTERY_BLINK_HALF_PERIOD_MS);
//! ```

// ============================================================================
// Registry
// ============================================================================

/// Default number of lock slots managed by one bridge.
pub const DEFAULT_MAX_LOCKS: usize = 8;

/// Hard upper bound on lock slots.
///
/// Slot indices are carried as `u8`, and each slot needs its own LED pin.
pub const MAX_SUPPORTED_LOCKS: usize = 32;

/// Maximum length of a lock display name, in characters.
///
/// Longer names are truncated, never rejected.
pub const MAX_LOCK_NAME_LENGTH: usize = 31;

/// Endpoint id of the bridge root node.
///
/// Bridged locks are never assigned this id.
pub const BRIDGE_ENDPOINT_ID: u16 = 0;

/// First endpoint id handed to a bridged lock.
pub const FIRST_LOCK_ENDPOINT_ID: u16 = 1;

/// Default LED GPIO numbers, one per slot.
pub const DEFAULT_LED_PINS: [u8; DEFAULT_MAX_LOCKS] = [4, 5, 16, 17, 18, 19, 21, 22];

/// Locks added when the bridge starts without explicit configuration.
pub const DEFAULT_LOCK_NAMES: [&str; 4] = ["Front Door", "Back Door", "Garage Door", "Side Gate"];

// ============================================================================
// Lock Operations
// ============================================================================

/// Time a lock operation takes on slot 0, in milliseconds.
pub const DEFAULT_BASE_DURATION_MS: u32 = 1500;

/// Extra operation time per slot index, in milliseconds.
///
/// Models mechanical variance between units.
pub const DEFAULT_PER_SLOT_INCREMENT_MS: u32 = 300;

/// Chance (percent) that a completed operation leaves the lock jammed.
pub const DEFAULT_JAM_CHANCE_PERCENT: u32 = 2;

/// Chance (percent) that a completed, non-jammed operation reports a fault.
pub const DEFAULT_FAULT_CHANCE_PERCENT: u32 = 1;

/// Chance (percent) that a battery health check reports low battery.
pub const DEFAULT_LOW_BATTERY_CHANCE_PERCENT: u32 = 5;

/// Exclusive upper bound of a percentage roll.
pub const PERCENT_ROLL_RANGE: u32 = 100;

// ============================================================================
// Status Indicator
// ============================================================================

/// Half-period of the jam blink pattern (fast blink), in milliseconds.
pub const JAM_BLINK_HALF_PERIOD_MS: u64 = 200;

/// Half-period of the low battery blink pattern (slow blink), in milliseconds.
pub const LOW_BATTERY_BLINK_HALF_PERIOD_MS: u64 = 1000;

/// Half-period of the identify pulse, in milliseconds.
pub const IDENTIFY_BLINK_HALF_PERIOD_MS: u64 = 100;

/// Default length of an identify pulse, in milliseconds.
pub const DEFAULT_IDENTIFY_DURATION_MS: u64 = 5000;

// ============================================================================
// Driving Loop
// ============================================================================

/// Cadence of the driving loop, in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Interval between periodic status displays, in milliseconds.
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 10_000;

/// Interval between battery health checks, in milliseconds.
pub const DEFAULT_BATTERY_CHECK_INTERVAL_MS: u64 = 30_000;

/// Capacity of the command channel feeding the driving loop.
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;
