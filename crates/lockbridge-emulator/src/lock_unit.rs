//! Per-lock operation state machine.
//!
//! A [`LockUnit`] models one smart lock: lock and unlock requests start a
//! timed operation, the driving loop's [`tick`](LockUnit::tick) completes it
//! once its duration has elapsed, and completion draws an outcome that may
//! leave the lock jammed or faulted.
//!
//! # States
//!
//! - `Unsecured` / `Secured`: resting states, reached by a successful
//!   operation or an immediate [`force_state`](LockUnit::force_state).
//! - `Unknown`: an operation is in flight, or the last one faulted.
//! - `Jammed`: the last operation jammed, or a jam was reported.
//!
//! # Valid Transitions
//!
//! - any → Unknown (`request_state`, only while idle)
//! - Unknown(in flight) → target | Jammed | Unknown(fault) (`tick` at completion)
//! - idle → Unsecured | Secured (`force_state`)
//! - Jammed | Unknown(idle) → target (`clear_errors`)
//!
//! Jammed and faulted locks stay that way until `clear_errors`, a new
//! `request_state`, or `force_state`.
//!
//! # Invariants
//!
//! - `current_state == Unknown` whenever an operation is in flight.
//! - `current_state == Jammed` implies `flags.jammed`.
//! - An idle lock with `flags.jammed` rests in `Jammed`.
//!
//! # Examples
//!
//! ```
//! use std::time::{Duration, Instant};
//! use lockbridge_core::{LockState, ScriptedRandom, SlotId, TargetState};
//! use lockbridge_emulator::{LockSettings, LockUnit, StatusIndicator};
//! use lockbridge_hardware::mock::MockPin;
//!
//! let (pin, _led) = MockPin::new("MOCK_0");
//! let start = Instant::now();
//! let slot = SlotId::new(0).unwrap();
//! let mut lock = LockUnit::new(slot, LockSettings::default(), StatusIndicator::new(pin), start);
//! let mut random = ScriptedRandom::always_succeed();
//!
//! lock.request_state(TargetState::Secured, start).unwrap();
//! assert_eq!(lock.current_state(), LockState::Unknown);
//!
//! lock.tick(start + Duration::from_millis(1500), &mut random);
//! assert!(lock.is_locked());
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use lockbridge_core::constants::{
    DEFAULT_BASE_DURATION_MS, DEFAULT_FAULT_CHANCE_PERCENT, DEFAULT_JAM_CHANCE_PERCENT,
    DEFAULT_PER_SLOT_INCREMENT_MS,
};
use lockbridge_core::{
    BridgeConfig, Error, LockFlags, LockState, RandomSource, Result, SlotId, TargetState,
};
use lockbridge_hardware::OutputPin;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::indicator::{IndicatorStatus, StatusIndicator};

/// Timing and failure parameters shared by all lock units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSettings {
    /// Operation time for slot 0, in milliseconds.
    pub base_duration_ms: u32,

    /// Extra operation time per slot index, in milliseconds.
    pub per_slot_increment_ms: u32,

    /// Percent chance that a completed operation jams.
    pub jam_chance_percent: u32,

    /// Percent chance that a completed, non-jammed operation faults.
    pub fault_chance_percent: u32,
}

impl LockSettings {
    /// Operation duration for a slot, in milliseconds.
    pub fn duration_ms_for(&self, slot: SlotId) -> u32 {
        let increment = self
            .per_slot_increment_ms
            .saturating_mul(slot.index() as u32);
        self.base_duration_ms.saturating_add(increment)
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            base_duration_ms: DEFAULT_BASE_DURATION_MS,
            per_slot_increment_ms: DEFAULT_PER_SLOT_INCREMENT_MS,
            jam_chance_percent: DEFAULT_JAM_CHANCE_PERCENT,
            fault_chance_percent: DEFAULT_FAULT_CHANCE_PERCENT,
        }
    }
}

impl From<&BridgeConfig> for LockSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            base_duration_ms: config.base_duration_ms,
            per_slot_increment_ms: config.per_slot_increment_ms,
            jam_chance_percent: config.jam_chance_percent,
            fault_chance_percent: config.fault_chance_percent,
        }
    }
}

/// A lock or unlock operation in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub started_at: Instant,
    pub duration_ms: u32,
}

impl Operation {
    /// Instant at which the operation completes.
    pub fn deadline(&self) -> Instant {
        self.started_at + Duration::from_millis(u64::from(self.duration_ms))
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        now >= self.deadline()
    }

    /// Time left before completion, zero once due.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline().saturating_duration_since(now)
    }
}

/// How a completed operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationOutcome {
    /// The lock reached its target state.
    Success,

    /// The bolt jammed.
    Jam,

    /// The lock reported a fault; its position is unknown.
    Fault,
}

impl OperationOutcome {
    /// Draw an outcome: jam first, then fault, otherwise success.
    ///
    /// The fault roll is only taken when the jam roll missed, so the two
    /// outcomes are mutually exclusive.
    pub fn draw<R: RandomSource + ?Sized>(random: &mut R, settings: &LockSettings) -> Self {
        if random.chance(settings.jam_chance_percent) {
            OperationOutcome::Jam
        } else if random.chance(settings.fault_chance_percent) {
            OperationOutcome::Fault
        } else {
            OperationOutcome::Success
        }
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome_str = match self {
            OperationOutcome::Success => "success",
            OperationOutcome::Jam => "jam",
            OperationOutcome::Fault => "fault",
        };
        write!(f, "{}", outcome_str)
    }
}

/// Externally observable lock fields at one point in time.
///
/// Compared before and after a mutation to decide what to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSnapshot {
    pub current: LockState,
    pub target: TargetState,
    pub flags: LockFlags,
    pub busy: bool,
}

/// State machine for one lock.
///
/// Owns the lock's status indicator and refreshes it after every change.
///
/// # Thread Safety
///
/// Not synchronized. All mutation is expected to happen from the single
/// driving loop that owns the registry.
#[derive(Debug)]
pub struct LockUnit<P> {
    slot: SlotId,
    current: LockState,
    target: TargetState,
    operation: Option<Operation>,
    flags: LockFlags,
    settings: LockSettings,
    indicator: StatusIndicator<P>,
}

impl<P: OutputPin> LockUnit<P> {
    /// Create an unlocked, idle lock with no flags raised.
    pub fn new(
        slot: SlotId,
        settings: LockSettings,
        indicator: StatusIndicator<P>,
        now: Instant,
    ) -> Self {
        let mut unit = Self {
            slot,
            current: LockState::Unsecured,
            target: TargetState::Unsecured,
            operation: None,
            flags: LockFlags::default(),
            settings,
            indicator,
        };
        unit.refresh_indicator(now);
        unit
    }

    /// Start moving towards `target`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Busy` if an operation is already in flight. Requests
    /// are rejected, not queued; the running operation is left untouched.
    pub fn request_state(&mut self, target: TargetState, now: Instant) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy { slot: self.slot });
        }

        let duration_ms = self.settings.duration_ms_for(self.slot);
        self.target = target;
        self.operation = Some(Operation {
            started_at: now,
            duration_ms,
        });
        self.current = LockState::Unknown;

        debug!(
            "Lock {} moving to {} ({}ms)",
            self.slot, target, duration_ms
        );
        self.refresh_indicator(now);
        Ok(())
    }

    /// Advance the operation timer and the indicator.
    ///
    /// Completes the in-flight operation once its duration has elapsed and
    /// returns the drawn outcome; returns `None` otherwise.
    pub fn tick<R: RandomSource + ?Sized>(
        &mut self,
        now: Instant,
        random: &mut R,
    ) -> Option<OperationOutcome> {
        let outcome = match self.operation {
            Some(operation) if operation.is_complete(now) => {
                let outcome = OperationOutcome::draw(random, &self.settings);
                self.complete(outcome, now);
                Some(outcome)
            }
            _ => None,
        };

        self.indicator.tick(now);
        outcome
    }

    /// Immediately set the lock to `locked`, clearing jam and fault.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` if an operation is in flight.
    pub fn force_state(&mut self, locked: bool, now: Instant) -> Result<()> {
        if self.is_busy() {
            return Err(Error::InvalidTransition {
                slot: self.slot,
                reason: "cannot override state while an operation is in progress".to_string(),
            });
        }

        self.target = TargetState::from_locked(locked);
        self.current = self.target.into();
        self.flags.jammed = false;
        self.flags.faulted = false;

        debug!("Lock {} set to {}", self.slot, self.current);
        self.refresh_indicator(now);
        Ok(())
    }

    /// Clear jam, fault and low battery.
    ///
    /// An idle lock resting in `Jammed` or `Unknown` returns to its target
    /// state. An in-flight operation is not affected.
    pub fn clear_errors(&mut self, now: Instant) {
        self.flags = LockFlags::default();

        if !self.is_busy() && matches!(self.current, LockState::Jammed | LockState::Unknown) {
            self.current = self.target.into();
        }

        info!("Lock {} errors cleared", self.slot);
        self.refresh_indicator(now);
    }

    /// Raise or clear the low battery flag.
    pub fn set_low_battery(&mut self, low: bool, now: Instant) {
        if low && !self.flags.low_battery {
            warn!("Lock {} - LOW BATTERY WARNING!", self.slot);
        }
        self.flags.low_battery = low;
        self.refresh_indicator(now);
    }

    /// Report a jam on an idle lock.
    ///
    /// # Errors
    ///
    /// Returns `Error::Busy` if an operation is in flight.
    pub fn set_jammed(&mut self, now: Instant) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy { slot: self.slot });
        }

        self.flags.jammed = true;
        self.current = LockState::Jammed;

        warn!("Lock {} JAMMED!", self.slot);
        self.refresh_indicator(now);
        Ok(())
    }

    /// Start an identify pulse on the indicator.
    pub fn identify(&mut self, now: Instant, duration: Duration) {
        self.indicator.identify(now, duration);
    }

    /// Abandon the in-flight operation, if any.
    ///
    /// The lock is left in `Unknown`; this is only meant for tearing a slot down.
    /// Returns `true` if an operation was cancelled.
    pub fn cancel_operation(&mut self) -> bool {
        self.operation.take().is_some()
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn current_state(&self) -> LockState {
        self.current
    }

    pub fn target_state(&self) -> TargetState {
        self.target
    }

    pub fn flags(&self) -> LockFlags {
        self.flags
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.operation.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.operation.is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.current.is_locked()
    }

    pub fn indicator(&self) -> &StatusIndicator<P> {
        &self.indicator
    }

    /// Status fed to the indicator. A busy or unknown lock counts as not locked.
    pub fn indicator_status(&self) -> IndicatorStatus {
        IndicatorStatus {
            locked: self.is_locked(),
            jammed: self.flags.jammed,
            low_battery: self.flags.low_battery,
        }
    }

    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            current: self.current,
            target: self.target,
            flags: self.flags,
            busy: self.is_busy(),
        }
    }

    /// Human-readable status line.
    ///
    /// ```text
    /// Lock 2: UNKNOWN (Operation in progress...) [LOW BATTERY]
    /// ```
    pub fn status_text(&self) -> String {
        format!("Lock {}: {}", self.slot, self.state_summary())
    }

    /// Current state followed by the in-progress marker and raised flags.
    pub fn state_summary(&self) -> String {
        let mut status = self.current.to_string();

        if self.is_busy() {
            status.push_str(" (Operation in progress...)");
        }
        if self.flags.low_battery {
            status.push_str(" [LOW BATTERY]");
        }
        if self.flags.faulted {
            status.push_str(" [FAULT]");
        }
        if self.flags.jammed {
            status.push_str(" [JAMMED]");
        }

        status
    }

    /// Release the indicator when the slot is torn down.
    pub fn into_indicator(self) -> StatusIndicator<P> {
        self.indicator
    }

    fn complete(&mut self, outcome: OperationOutcome, now: Instant) {
        self.operation = None;

        // Each completion replaces the previous jam/fault state.
        match outcome {
            OperationOutcome::Jam => {
                self.flags.jammed = true;
                self.flags.faulted = false;
                self.current = LockState::Jammed;
                warn!("Lock {} JAMMED!", self.slot);
            }
            OperationOutcome::Fault => {
                self.flags.jammed = false;
                self.flags.faulted = true;
                self.current = LockState::Unknown;
                warn!("Lock {} FAULT detected!", self.slot);
            }
            OperationOutcome::Success => {
                self.flags.jammed = false;
                self.flags.faulted = false;
                self.current = self.target.into();
                info!("Lock {} operation complete: {}", self.slot, self.current);
            }
        }

        self.refresh_indicator(now);
    }

    fn refresh_indicator(&mut self, now: Instant) {
        let status = self.indicator_status();
        self.indicator.refresh(status, now);
        debug_assert!(self.invariants_hold(), "{:?}", self.snapshot());
    }

    fn invariants_hold(&self) -> bool {
        let busy_is_unknown = !self.is_busy() || self.current == LockState::Unknown;
        let jammed_has_flag = self.current != LockState::Jammed || self.flags.jammed;
        let idle_jam_rests = !(self.flags.jammed && !self.is_busy())
            || self.current == LockState::Jammed;
        busy_is_unknown && jammed_has_flag && idle_jam_rests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::IndicatorMode;
    use lockbridge_core::ScriptedRandom;
    use lockbridge_hardware::PinLevel;
    use lockbridge_hardware::mock::{MockPin, MockPinHandle};
    use rstest::rstest;

    fn lock_at(index: usize, start: Instant) -> (LockUnit<MockPin>, MockPinHandle) {
        let (pin, handle) = MockPin::new(format!("MOCK_{index}"));
        let slot = SlotId::new(index).unwrap();
        let unit = LockUnit::new(
            slot,
            LockSettings::default(),
            StatusIndicator::new(pin),
            start,
        );
        (unit, handle)
    }

    fn succeed() -> ScriptedRandom {
        ScriptedRandom::always_succeed()
    }

    fn jam() -> ScriptedRandom {
        let random = ScriptedRandom::always_succeed();
        random.push(0);
        random
    }

    fn fault() -> ScriptedRandom {
        let random = ScriptedRandom::always_succeed();
        random.push(99);
        random.push(0);
        random
    }

    fn complete(unit: &mut LockUnit<MockPin>, target: TargetState, start: Instant, random: &mut ScriptedRandom) {
        unit.request_state(target, start).unwrap();
        let deadline = unit.operation().unwrap().deadline();
        assert!(unit.tick(deadline, random).is_some());
    }

    #[test]
    fn test_new_lock_is_unsecured_and_idle() {
        let start = Instant::now();
        let (unit, led) = lock_at(0, start);

        assert_eq!(unit.current_state(), LockState::Unsecured);
        assert_eq!(unit.target_state(), TargetState::Unsecured);
        assert_eq!(unit.flags(), LockFlags::default());
        assert!(!unit.is_busy());
        assert_eq!(led.level(), PinLevel::Low);
    }

    #[test]
    fn test_request_state_starts_operation() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        unit.request_state(TargetState::Secured, start).unwrap();

        assert!(unit.is_busy());
        assert_eq!(unit.current_state(), LockState::Unknown);
        assert_eq!(unit.target_state(), TargetState::Secured);
        assert_eq!(unit.operation().unwrap().started_at, start);
        assert!(!unit.is_locked());
    }

    #[test]
    fn test_second_request_while_busy_is_rejected() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(1, start);

        unit.request_state(TargetState::Secured, start).unwrap();
        let before = *unit.operation().unwrap();

        let later = start + Duration::from_millis(10);
        let result = unit.request_state(TargetState::Unsecured, later);

        assert!(matches!(result, Err(Error::Busy { .. })));
        assert_eq!(*unit.operation().unwrap(), before);
        assert_eq!(unit.target_state(), TargetState::Secured);
    }

    #[rstest]
    #[case(0, 1500)]
    #[case(1, 1800)]
    #[case(3, 2400)]
    #[case(7, 3600)]
    fn test_operation_duration_per_slot(#[case] index: usize, #[case] expected_ms: u32) {
        let start = Instant::now();
        let (mut unit, _) = lock_at(index, start);
        let mut random = succeed();

        unit.request_state(TargetState::Secured, start).unwrap();
        assert_eq!(unit.operation().unwrap().duration_ms, expected_ms);

        let almost = start + Duration::from_millis(u64::from(expected_ms) - 1);
        assert_eq!(unit.tick(almost, &mut random), None);
        assert_eq!(unit.current_state(), LockState::Unknown);
        assert!(unit.is_busy());

        let due = start + Duration::from_millis(u64::from(expected_ms));
        assert_eq!(unit.tick(due, &mut random), Some(OperationOutcome::Success));
        assert_eq!(unit.current_state(), LockState::Secured);
        assert!(!unit.is_busy());
    }

    #[test]
    fn test_tick_without_operation_is_noop() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);
        let mut random = jam();

        assert_eq!(unit.tick(start + Duration::from_secs(60), &mut random), None);
        assert_eq!(unit.current_state(), LockState::Unsecured);
        // No roll was consumed.
        assert_eq!(random.remaining(), 1);
    }

    #[test]
    fn test_completion_jam() {
        let start = Instant::now();
        let (mut unit, led) = lock_at(0, start);

        complete(&mut unit, TargetState::Secured, start, &mut jam());

        assert_eq!(unit.current_state(), LockState::Jammed);
        assert!(unit.flags().jammed);
        assert!(!unit.flags().faulted);
        assert!(!unit.is_busy());
        assert_eq!(unit.indicator().mode(), IndicatorMode::FastBlink);
        assert_eq!(led.level(), PinLevel::High);
    }

    #[test]
    fn test_completion_fault() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        complete(&mut unit, TargetState::Secured, start, &mut fault());

        assert_eq!(unit.current_state(), LockState::Unknown);
        assert!(unit.flags().faulted);
        assert!(!unit.flags().jammed);
        assert!(!unit.is_busy());
        assert_eq!(unit.indicator().mode(), IndicatorMode::Off);
    }

    #[test]
    fn test_successful_completion_clears_previous_errors() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        complete(&mut unit, TargetState::Secured, start, &mut jam());
        assert_eq!(unit.current_state(), LockState::Jammed);

        let later = start + Duration::from_secs(5);
        complete(&mut unit, TargetState::Unsecured, later, &mut succeed());

        assert_eq!(unit.current_state(), LockState::Unsecured);
        assert!(!unit.flags().jammed);
        assert!(!unit.flags().faulted);
    }

    #[test]
    fn test_fault_after_jam_replaces_jam() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        complete(&mut unit, TargetState::Secured, start, &mut jam());
        complete(
            &mut unit,
            TargetState::Secured,
            start + Duration::from_secs(5),
            &mut fault(),
        );

        assert_eq!(unit.current_state(), LockState::Unknown);
        assert!(!unit.flags().jammed);
        assert!(unit.flags().faulted);
    }

    #[test]
    fn test_force_state_when_idle() {
        let start = Instant::now();
        let (mut unit, led) = lock_at(0, start);

        unit.force_state(true, start).unwrap();
        assert_eq!(unit.current_state(), LockState::Secured);
        assert_eq!(unit.target_state(), TargetState::Secured);
        assert_eq!(led.level(), PinLevel::High);

        unit.force_state(false, start).unwrap();
        assert_eq!(unit.current_state(), LockState::Unsecured);
        assert_eq!(led.level(), PinLevel::Low);
    }

    #[test]
    fn test_force_state_while_busy_is_rejected() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        unit.request_state(TargetState::Secured, start).unwrap();
        let result = unit.force_state(false, start);

        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        assert!(unit.is_busy());
        assert_eq!(unit.current_state(), LockState::Unknown);
        assert_eq!(unit.target_state(), TargetState::Secured);
    }

    #[test]
    fn test_force_state_clears_jam_and_fault() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        unit.set_jammed(start).unwrap();
        unit.force_state(false, start).unwrap();

        assert_eq!(unit.current_state(), LockState::Unsecured);
        assert!(!unit.flags().has_error());
    }

    #[test]
    fn test_clear_errors_on_jammed_lock_returns_to_target() {
        let start = Instant::now();
        let (mut unit, led) = lock_at(0, start);

        complete(&mut unit, TargetState::Secured, start, &mut jam());
        unit.set_low_battery(true, start);

        unit.clear_errors(start);

        assert_eq!(unit.current_state(), LockState::Secured);
        assert_eq!(unit.flags(), LockFlags::default());
        assert_eq!(unit.indicator().mode(), IndicatorMode::On);
        assert_eq!(led.level(), PinLevel::High);
    }

    #[test]
    fn test_clear_errors_on_faulted_lock_returns_to_target() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        complete(&mut unit, TargetState::Secured, start, &mut fault());
        unit.clear_errors(start);

        assert_eq!(unit.current_state(), LockState::Secured);
        assert!(!unit.flags().faulted);
    }

    #[test]
    fn test_clear_errors_while_busy_keeps_operation() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        unit.set_low_battery(true, start);
        unit.request_state(TargetState::Secured, start).unwrap();
        unit.clear_errors(start);

        assert!(unit.is_busy());
        assert_eq!(unit.current_state(), LockState::Unknown);
        assert!(!unit.flags().low_battery);
    }

    #[test]
    fn test_low_battery_independent_of_operation() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        unit.request_state(TargetState::Secured, start).unwrap();
        unit.set_low_battery(true, start);

        assert!(unit.flags().low_battery);
        assert!(unit.is_busy());
        assert_eq!(unit.indicator().mode(), IndicatorMode::SlowBlink);

        unit.set_low_battery(false, start);
        assert_eq!(unit.indicator().mode(), IndicatorMode::Off);
    }

    #[test]
    fn test_jam_beats_low_battery_on_indicator() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        unit.set_low_battery(true, start);
        unit.set_jammed(start).unwrap();

        assert_eq!(unit.indicator().mode(), IndicatorMode::FastBlink);
    }

    #[test]
    fn test_set_jammed_while_busy_is_rejected() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        unit.request_state(TargetState::Secured, start).unwrap();
        assert!(matches!(unit.set_jammed(start), Err(Error::Busy { .. })));
        assert!(!unit.flags().jammed);
    }

    #[test]
    fn test_request_from_jammed_state() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        unit.set_jammed(start).unwrap();
        unit.request_state(TargetState::Unsecured, start).unwrap();

        assert_eq!(unit.current_state(), LockState::Unknown);
        // The jam flag stays up until the operation completes.
        assert!(unit.flags().jammed);
        assert_eq!(unit.indicator().mode(), IndicatorMode::FastBlink);
    }

    #[test]
    fn test_cancel_operation() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        assert!(!unit.cancel_operation());
        unit.request_state(TargetState::Secured, start).unwrap();
        assert!(unit.cancel_operation());
        assert!(!unit.is_busy());
    }

    #[test]
    fn test_indicator_blinks_through_lock_tick() {
        let start = Instant::now();
        let (mut unit, led) = lock_at(0, start);
        let mut random = succeed();

        unit.set_jammed(start).unwrap();
        assert_eq!(led.level(), PinLevel::High);

        unit.tick(start + Duration::from_millis(200), &mut random);
        assert_eq!(led.level(), PinLevel::Low);
    }

    #[test]
    fn test_identify_through_lock() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);
        let mut random = succeed();

        unit.force_state(true, start).unwrap();
        unit.identify(start, Duration::from_secs(5));
        assert_eq!(unit.indicator().mode(), IndicatorMode::Identify);

        unit.tick(start + Duration::from_secs(5), &mut random);
        assert_eq!(unit.indicator().mode(), IndicatorMode::On);
    }

    #[test]
    fn test_status_text() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(1, start);

        assert_eq!(unit.status_text(), "Lock 2: UNLOCKED");

        unit.set_low_battery(true, start);
        unit.request_state(TargetState::Secured, start).unwrap();
        assert_eq!(
            unit.status_text(),
            "Lock 2: UNKNOWN (Operation in progress...) [LOW BATTERY]"
        );
    }

    #[test]
    fn test_status_text_jammed() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        unit.set_jammed(start).unwrap();
        assert_eq!(unit.status_text(), "Lock 1: JAMMED [JAMMED]");
    }

    #[test]
    fn test_snapshot_tracks_fields() {
        let start = Instant::now();
        let (mut unit, _) = lock_at(0, start);

        let before = unit.snapshot();
        unit.request_state(TargetState::Secured, start).unwrap();
        let after = unit.snapshot();

        assert_ne!(before, after);
        assert!(after.busy);
        assert_eq!(after.current, LockState::Unknown);
        assert_eq!(after.target, TargetState::Secured);
    }

    #[test]
    fn test_outcome_draw_order() {
        let settings = LockSettings::default();

        assert_eq!(OperationOutcome::draw(&mut jam(), &settings), OperationOutcome::Jam);
        assert_eq!(OperationOutcome::draw(&mut fault(), &settings), OperationOutcome::Fault);
        assert_eq!(
            OperationOutcome::draw(&mut succeed(), &settings),
            OperationOutcome::Success
        );
    }

    #[rstest]
    #[case(0, 1500)]
    #[case(1, 1800)]
    #[case(7, 3600)]
    fn test_duration_grows_per_slot(#[case] index: usize, #[case] expected: u32) {
        let settings = LockSettings::from(&BridgeConfig::default());
        assert_eq!(settings.duration_ms_for(SlotId::new(index).unwrap()), expected);
    }

    #[test]
    fn test_settings_from_config() {
        let config = BridgeConfig {
            base_duration_ms: 1000,
            per_slot_increment_ms: 100,
            ..BridgeConfig::default()
        };
        let settings = LockSettings::from(&config);

        assert_eq!(settings.duration_ms_for(SlotId::new(2).unwrap()), 1200);
        assert_eq!(settings.jam_chance_percent, 2);
    }
}
