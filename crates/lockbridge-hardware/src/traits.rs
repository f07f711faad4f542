//! Hardware output trait definitions.
//!
//! The status indicators only ever need two things from the hardware: drive
//! a binary output and read back the level last driven. Both are synchronous
//! and non-blocking so they can run inside the driving loop's tick.

use crate::types::PinLevel;

/// A single binary output, such as a status LED.
///
/// # Examples
///
/// ```
/// use lockbridge_hardware::traits::OutputPin;
/// use lockbridge_hardware::types::PinLevel;
///
/// fn flash<P: OutputPin>(pin: &mut P) {
///     pin.set_level(pin.level().toggled());
/// }
/// ```
pub trait OutputPin: Send {
    /// Drive the output to the given level.
    fn set_level(&mut self, level: PinLevel);

    /// Level the output is currently driven to.
    fn level(&self) -> PinLevel;

    /// Human-readable pin label, e.g. `GPIO_4`.
    fn label(&self) -> String;

    /// Drive the output high.
    fn set_high(&mut self) {
        self.set_level(PinLevel::High);
    }

    /// Drive the output low.
    fn set_low(&mut self) {
        self.set_level(PinLevel::Low);
    }

    /// Invert the output level.
    fn toggle(&mut self) {
        let next = self.level().toggled();
        self.set_level(next);
    }
}
