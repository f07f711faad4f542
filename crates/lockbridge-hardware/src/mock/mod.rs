//! Mock output implementations for testing and development.
//!
//! This module provides simulated outputs that record every write so tests
//! can assert on hardware interaction without physical pins.

pub mod pin;

pub use pin::{MockPin, MockPinHandle};
