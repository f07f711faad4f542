//! Mock output pin for testing.
//!
//! A [`MockPin`] keeps its state behind a shared lock so that a
//! [`MockPinHandle`] kept by the test can observe the level and count writes
//! after the pin itself has been moved into an indicator.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::traits::OutputPin;
use crate::types::PinLevel;

#[derive(Debug, Default)]
struct MockPinState {
    level: PinLevel,
    writes: usize,
    transitions: usize,
}

/// Mock output pin.
///
/// # Examples
///
/// ```
/// use lockbridge_hardware::mock::MockPin;
/// use lockbridge_hardware::traits::OutputPin;
/// use lockbridge_hardware::types::PinLevel;
///
/// let (mut pin, handle) = MockPin::new("MOCK_0");
/// pin.set_high();
///
/// assert_eq!(handle.level(), PinLevel::High);
/// assert_eq!(handle.write_count(), 1);
/// ```
#[derive(Debug)]
pub struct MockPin {
    state: Arc<Mutex<MockPinState>>,
    label: String,
}

impl MockPin {
    /// Create a mock pin and its observation handle. The pin starts low.
    pub fn new(label: impl Into<String>) -> (Self, MockPinHandle) {
        let state = Arc::new(Mutex::new(MockPinState::default()));
        let pin = Self {
            state: Arc::clone(&state),
            label: label.into(),
        };
        (pin, MockPinHandle { state })
    }

    /// Create `count` mock pins labelled `MOCK_0`, `MOCK_1`, ...
    pub fn bank(count: usize) -> (Vec<Self>, Vec<MockPinHandle>) {
        (0..count).map(|i| Self::new(format!("MOCK_{i}"))).unzip()
    }
}

impl OutputPin for MockPin {
    fn set_level(&mut self, level: PinLevel) {
        let mut state = self.state.lock();
        if state.level != level {
            state.transitions += 1;
        }
        state.level = level;
        state.writes += 1;
    }

    fn level(&self) -> PinLevel {
        self.state.lock().level
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// Handle for observing a mock pin.
#[derive(Debug, Clone)]
pub struct MockPinHandle {
    state: Arc<Mutex<MockPinState>>,
}

impl MockPinHandle {
    /// Level the pin is currently driven to.
    pub fn level(&self) -> PinLevel {
        self.state.lock().level
    }

    /// Number of `set_level` calls, including writes of an unchanged level.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// Number of writes that changed the level.
    pub fn transition_count(&self) -> usize {
        self.state.lock().transitions
    }

    /// Reset the write and transition counters, keeping the level.
    pub fn reset_counts(&self) {
        let mut state = self.state.lock();
        state.writes = 0;
        state.transitions = 0;
    }
}
