//! Status LED driven from a lock's derived status.
//!
//! A [`StatusIndicator`] owns one output pin and shows exactly one visual mode
//! at a time:
//!
//! | Mode | Trigger | Output |
//! |------|---------|--------|
//! | `Off` | unlocked (or unknown) | solid low |
//! | `On` | locked | solid high |
//! | `SlowBlink` | low battery | toggles every 1000 ms |
//! | `FastBlink` | jammed | toggles every 200 ms |
//! | `Identify` | identify request | toggles every 100 ms until it expires |
//!
//! Priority is jammed > low battery > locked/unlocked. An identify pulse
//! overrides the status-derived mode for its duration, then the indicator
//! falls back to whatever the latest status asks for.
//!
//! Blinking is not timer-driven: [`StatusIndicator::tick`] is sampled by the
//! driving loop and toggles the output whenever a half-period has elapsed.
//!
//! # Examples
//!
//! ```
//! use std::time::{Duration, Instant};
//! use lockbridge_emulator::{IndicatorMode, IndicatorStatus, StatusIndicator};
//! use lockbridge_hardware::mock::MockPin;
//! use lockbridge_hardware::PinLevel;
//!
//! let (pin, led) = MockPin::new("MOCK_0");
//! let mut indicator = StatusIndicator::new(pin);
//! let start = Instant::now();
//!
//! indicator.refresh(IndicatorStatus { locked: false, jammed: true, low_battery: false }, start);
//! assert_eq!(indicator.mode(), IndicatorMode::FastBlink);
//! assert_eq!(led.level(), PinLevel::High);
//!
//! indicator.tick(start + Duration::from_millis(200));
//! assert_eq!(led.level(), PinLevel::Low);
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use lockbridge_core::constants::{
    IDENTIFY_BLINK_HALF_PERIOD_MS, JAM_BLINK_HALF_PERIOD_MS, LOW_BATTERY_BLINK_HALF_PERIOD_MS,
};
use lockbridge_hardware::{OutputPin, PinLevel};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Status inputs the indicator derives its mode from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorStatus {
    pub locked: bool,
    pub jammed: bool,
    pub low_battery: bool,
}

/// Visual mode shown by a status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorMode {
    /// Solid off.
    Off,

    /// Solid on.
    On,

    /// Low battery blink.
    SlowBlink,

    /// Jam blink.
    FastBlink,

    /// Identify pulse.
    Identify,
}

impl IndicatorMode {
    /// Mode for a status, applying jammed > low battery > locked priority.
    pub fn from_status(status: IndicatorStatus) -> Self {
        if status.jammed {
            IndicatorMode::FastBlink
        } else if status.low_battery {
            IndicatorMode::SlowBlink
        } else if status.locked {
            IndicatorMode::On
        } else {
            IndicatorMode::Off
        }
    }

    /// Time between toggles for blinking modes, `None` for solid modes.
    pub fn half_period(&self) -> Option<Duration> {
        let ms = match self {
            IndicatorMode::Off | IndicatorMode::On => return None,
            IndicatorMode::SlowBlink => LOW_BATTERY_BLINK_HALF_PERIOD_MS,
            IndicatorMode::FastBlink => JAM_BLINK_HALF_PERIOD_MS,
            IndicatorMode::Identify => IDENTIFY_BLINK_HALF_PERIOD_MS,
        };
        Some(Duration::from_millis(ms))
    }

    pub fn is_blinking(&self) -> bool {
        self.half_period().is_some()
    }
}

impl fmt::Display for IndicatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode_str = match self {
            IndicatorMode::Off => "off",
            IndicatorMode::On => "on",
            IndicatorMode::SlowBlink => "slow blink",
            IndicatorMode::FastBlink => "fast blink",
            IndicatorMode::Identify => "identify",
        };
        write!(f, "{}", mode_str)
    }
}

#[derive(Debug, Clone, Copy)]
struct Blink {
    half_period: Duration,
    last_toggle: Instant,
}

/// Status LED for one lock slot.
///
/// Owns its output pin. Hardware is only touched when the applied mode
/// changes or a blink half-period elapses.
#[derive(Debug)]
pub struct StatusIndicator<P> {
    pin: P,

    /// Mode the latest status asks for.
    status_mode: IndicatorMode,

    /// Mode currently driven onto the pin.
    active_mode: IndicatorMode,

    /// Present iff `active_mode` is a blinking mode.
    blink: Option<Blink>,

    identify_until: Option<Instant>,
}

impl<P: OutputPin> StatusIndicator<P> {
    /// Take ownership of a pin and drive it low.
    pub fn new(mut pin: P) -> Self {
        pin.set_low();
        Self {
            pin,
            status_mode: IndicatorMode::Off,
            active_mode: IndicatorMode::Off,
            blink: None,
            identify_until: None,
        }
    }

    /// Recompute the mode from a lock's status.
    ///
    /// Idempotent: when the resulting mode is already applied, the pin is not
    /// written. Returns `true` if the applied mode changed.
    pub fn refresh(&mut self, status: IndicatorStatus, now: Instant) -> bool {
        self.status_mode = IndicatorMode::from_status(status);
        self.apply(self.effective_mode(), now)
    }

    /// Advance blink timing and expire an identify pulse.
    ///
    /// Returns `true` if the output level changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let Some(until) = self.identify_until
            && now >= until
        {
            self.identify_until = None;
            let before = self.pin.level();
            self.apply(self.status_mode, now);
            return self.pin.level() != before;
        }

        match self.blink.as_mut() {
            Some(blink) if now.saturating_duration_since(blink.last_toggle) >= blink.half_period => {
                self.pin.toggle();
                blink.last_toggle += blink.half_period;
                // After a stall, resume from now instead of replaying missed toggles.
                if now.saturating_duration_since(blink.last_toggle) >= blink.half_period {
                    blink.last_toggle = now;
                }
                true
            }
            _ => false,
        }
    }

    /// Show the identify pulse for `duration`, then restore the status mode.
    ///
    /// A second request while identifying extends the pulse.
    pub fn identify(&mut self, now: Instant, duration: Duration) {
        self.identify_until = Some(now + duration);
        self.apply(IndicatorMode::Identify, now);
    }

    /// Stop any blinking, cancel identify, and drive the output low.
    pub fn stop(&mut self) {
        self.blink = None;
        self.identify_until = None;
        self.status_mode = IndicatorMode::Off;
        self.active_mode = IndicatorMode::Off;
        self.pin.set_low();
    }

    /// Mode currently driven onto the pin.
    pub fn mode(&self) -> IndicatorMode {
        self.active_mode
    }

    pub fn level(&self) -> PinLevel {
        self.pin.level()
    }

    pub fn pin_label(&self) -> String {
        self.pin.label()
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.is_some()
    }

    pub fn is_identifying(&self) -> bool {
        self.identify_until.is_some()
    }

    fn effective_mode(&self) -> IndicatorMode {
        if self.identify_until.is_some() {
            IndicatorMode::Identify
        } else {
            self.status_mode
        }
    }

    fn apply(&mut self, mode: IndicatorMode, now: Instant) -> bool {
        if mode == self.active_mode {
            return false;
        }

        // Previous blinking must stop before the new mode takes the pin.
        self.blink = None;

        match mode.half_period() {
            Some(half_period) => {
                self.pin.set_high();
                self.blink = Some(Blink {
                    half_period,
                    last_toggle: now,
                });
            }
            None => self.pin.set_level(PinLevel::from_bool(mode == IndicatorMode::On)),
        }

        trace!(
            "{} indicator {} -> {}",
            self.pin.label(),
            self.active_mode,
            mode
        );
        self.active_mode = mode;
        true
    }
}
