//! Hardware output abstraction layer for the lock bridge.
//!
//! Each bridged lock has one physical status LED. This crate defines the
//! [`OutputPin`] trait the status indicators drive, plus two implementations:
//!
//! - [`SimulatedGpioPin`](gpio::SimulatedGpioPin): validates an ESP32 GPIO
//!   number and traces level changes. Used by the bridge binary.
//! - [`MockPin`](mock::MockPin): records every write behind a shared handle
//!   so tests can assert on hardware interaction.
//!
//! # Design Philosophy
//!
//! - **Synchronous**: setting a level never blocks, so indicators can be
//!   refreshed from inside the driving loop's tick.
//! - **Owned**: each pin is owned by exactly one indicator; there is no
//!   global pin table.
//!
//! # Examples
//!
//! ```
//! use lockbridge_hardware::gpio::SimulatedGpioPin;
//! use lockbridge_hardware::traits::OutputPin;
//!
//! let mut led = SimulatedGpioPin::new(4)?;
//! led.set_high();
//! assert!(led.level().is_high());
//! # Ok::<(), lockbridge_hardware::HardwareError>(())
//! ```
//!
//! [`OutputPin`]: traits::OutputPin

pub mod error;
pub mod gpio;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use gpio::SimulatedGpioPin;
pub use traits::OutputPin;
pub use types::{GpioNumber, PinLevel};
