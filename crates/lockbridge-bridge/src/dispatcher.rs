//! Command dispatcher.
//!
//! [`CommandDispatcher`] is the single owner of the lock registry. Protocol
//! callbacks, administrative text commands, the periodic tick and the battery
//! simulation all go through it, so every mutation of a lock happens in one
//! place.
//!
//! Each mutation is bracketed by a [`LockSnapshot`] taken before and after;
//! whatever differs is reported to the [`StatePublisher`].
//!
//! # Examples
//!
//! ```
//! use lockbridge_bridge::{BridgeCommand, CommandDispatcher};
//! use lockbridge_bridge::protocol::TracingPublisher;
//! use lockbridge_core::{BridgeConfig, ScriptedRandom, SystemClock};
//! use lockbridge_hardware::mock::MockPin;
//!
//! let config = BridgeConfig::default();
//! let (pins, _leds) = MockPin::bank(config.max_locks);
//! let mut dispatcher = CommandDispatcher::from_config(
//!     pins,
//!     &config,
//!     Box::new(SystemClock),
//!     Box::new(ScriptedRandom::always_succeed()),
//!     Box::new(TracingPublisher),
//! )?;
//!
//! let reply = dispatcher.execute_line("add Front Door");
//! assert!(reply.success);
//!
//! let reply = dispatcher.execute_line("lock 1");
//! assert_eq!(reply.message, "Locked Front Door");
//! # Ok::<(), lockbridge_core::Error>(())
//! ```

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use lockbridge_core::constants::{
    BRIDGE_ENDPOINT_ID, DEFAULT_IDENTIFY_DURATION_MS, DEFAULT_LOW_BATTERY_CHANCE_PERCENT,
};
use lockbridge_core::{
    BridgeConfig, Clock, Error, LockIdentity, LockName, RandomSource, Result, SlotId, TargetState,
};
use lockbridge_emulator::{LockRegistry, LockSnapshot, LockUnit, OperationOutcome};
use lockbridge_hardware::OutputPin;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::command::{BridgeCommand, HELP_TEXT};
use crate::protocol::{LockAddress, StatePublisher};

/// Result of an administrative command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub success: bool,
    pub message: String,
}

impl CommandReply {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<Error> for CommandReply {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidCommand(message) => CommandReply::failure(message),
            other => CommandReply::failure(other.to_string()),
        }
    }
}

/// Routes external requests onto the lock registry.
pub struct CommandDispatcher<P> {
    registry: LockRegistry<P>,
    clock: Box<dyn Clock>,
    random: Box<dyn RandomSource>,
    publisher: Box<dyn StatePublisher>,
    identify_duration: Duration,
    low_battery_chance_percent: u32,
}

impl<P: OutputPin> CommandDispatcher<P> {
    pub fn new(
        registry: LockRegistry<P>,
        clock: Box<dyn Clock>,
        random: Box<dyn RandomSource>,
        publisher: Box<dyn StatePublisher>,
    ) -> Self {
        Self {
            registry,
            clock,
            random,
            publisher,
            identify_duration: Duration::from_millis(DEFAULT_IDENTIFY_DURATION_MS),
            low_battery_chance_percent: DEFAULT_LOW_BATTERY_CHANCE_PERCENT,
        }
    }

    /// Build a dispatcher and its registry from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid or fewer than
    /// `max_locks` pins are given.
    pub fn from_config(
        pins: Vec<P>,
        config: &BridgeConfig,
        clock: Box<dyn Clock>,
        random: Box<dyn RandomSource>,
        publisher: Box<dyn StatePublisher>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = LockRegistry::from_config(pins, config)?;

        Ok(Self::new(registry, clock, random, publisher)
            .with_identify_duration(config.identify_duration())
            .with_low_battery_chance(config.low_battery_chance_percent))
    }

    pub fn with_identify_duration(mut self, duration: Duration) -> Self {
        self.identify_duration = duration;
        self
    }

    pub fn with_low_battery_chance(mut self, percent: u32) -> Self {
        self.low_battery_chance_percent = percent;
        self
    }

    pub fn registry(&self) -> &LockRegistry<P> {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Protocol callbacks
    // ------------------------------------------------------------------

    /// A protocol layer asked a lock to move to `target`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownIdentity` if no lock answers to `identity`, and
    /// `Error::Busy` if the lock already has an operation in flight.
    pub fn on_target_state_changed(
        &mut self,
        identity: LockIdentity,
        target: TargetState,
    ) -> Result<SlotId> {
        let slot = self.resolve(identity)?;
        self.request_state(slot, target)?;
        Ok(slot)
    }

    /// A protocol layer asked a lock to identify itself.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownIdentity` if no lock answers to `identity`.
    pub fn on_identify(&mut self, identity: LockIdentity) -> Result<SlotId> {
        let slot = self.resolve(identity)?;
        self.identify(slot)?;
        Ok(slot)
    }

    /// Reconcile a lock against an external source of truth.
    ///
    /// Only a quiescent lock is overwritten: one with no operation in flight
    /// and no jam or fault. Returns `true` if the state was applied.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownSlot` if the slot is vacant.
    pub fn on_external_authoritative_state(&mut self, slot: SlotId, locked: bool) -> Result<bool> {
        self.mutate(slot, |unit, now| {
            if unit.is_busy() || unit.flags().has_error() {
                debug!("Lock {} not quiescent, external state ignored", slot);
                return Ok(false);
            }
            unit.force_state(locked, now)?;
            Ok(true)
        })
    }

    // ------------------------------------------------------------------
    // Lock operations
    // ------------------------------------------------------------------

    /// Add a lock in the lowest free slot.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapacityExceeded` when the registry is full.
    pub fn add_lock(&mut self, name: &str) -> Result<SlotId> {
        let now = self.clock.now();
        let slot = self.registry.add(name, now)?;

        if let Some(entry) = self.registry.entry(slot) {
            let address = LockAddress::from(entry);
            self.publisher.publish_added(address, entry.name().as_str());
            self.publisher
                .publish_current_state(address, entry.unit().current_state());
        }

        Ok(slot)
    }

    /// Remove a lock, abandoning any in-flight operation.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownSlot` if the slot is vacant.
    pub fn remove_lock(&mut self, slot: SlotId) -> Result<LockName> {
        let address = self
            .registry
            .entry(slot)
            .map(LockAddress::from)
            .ok_or(Error::UnknownSlot(slot.number()))?;

        let name = self.registry.remove(slot)?;
        self.publisher.publish_removed(address);
        Ok(name)
    }

    /// Start a timed operation towards `target`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownSlot` if the slot is vacant and `Error::Busy`
    /// if an operation is already in flight.
    pub fn request_state(&mut self, slot: SlotId, target: TargetState) -> Result<()> {
        self.mutate(slot, |unit, now| unit.request_state(target, now))
    }

    /// Immediately lock. A jammed lock must be cleared first.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` if the lock is jammed or busy.
    pub fn lock(&mut self, slot: SlotId) -> Result<()> {
        self.mutate(slot, |unit, now| {
            if unit.flags().jammed {
                return Err(Error::InvalidTransition {
                    slot,
                    reason: "lock is jammed, clear it first".to_string(),
                });
            }
            unit.force_state(true, now)
        })
    }

    /// Immediately unlock, clearing any jam or fault.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` if an operation is in flight.
    pub fn unlock(&mut self, slot: SlotId) -> Result<()> {
        self.mutate(slot, |unit, now| unit.force_state(false, now))
    }

    /// Mark an idle lock jammed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Busy` if an operation is in flight.
    pub fn set_jam(&mut self, slot: SlotId) -> Result<()> {
        self.mutate(slot, |unit, now| unit.set_jammed(now))
    }

    /// Flip the low battery flag, returning the new value.
    pub fn toggle_low_battery(&mut self, slot: SlotId) -> Result<bool> {
        self.mutate(slot, |unit, now| {
            let low = !unit.flags().low_battery;
            unit.set_low_battery(low, now);
            Ok(low)
        })
    }

    pub fn clear_errors(&mut self, slot: SlotId) -> Result<()> {
        self.mutate(slot, |unit, now| {
            unit.clear_errors(now);
            Ok(())
        })
    }

    /// Start the identify pulse on a lock's indicator.
    pub fn identify(&mut self, slot: SlotId) -> Result<()> {
        let duration = self.identify_duration;
        self.mutate(slot, |unit, now| {
            unit.identify(now, duration);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Periodic work
    // ------------------------------------------------------------------

    /// Advance every active lock and indicator.
    ///
    /// Returns the operations that completed during this tick.
    pub fn tick(&mut self) -> Vec<(SlotId, OperationOutcome)> {
        let now = self.clock.now();
        let random = self.random.as_mut();
        let publisher = self.publisher.as_mut();
        let mut completed = Vec::new();

        for entry in self.registry.iter_active_mut() {
            let address = LockAddress::from(&*entry);
            let before = entry.unit().snapshot();

            if let Some(outcome) = entry.unit_mut().tick(now, &mut *random) {
                publish_changes(&mut *publisher, address, before, entry.unit().snapshot());
                completed.push((address.slot, outcome));
            }
        }

        completed
    }

    /// Roll a battery check for every active lock.
    ///
    /// Returns the number of locks whose low battery flag changed.
    pub fn simulate_battery_health(&mut self) -> usize {
        let now = self.clock.now();
        let chance = self.low_battery_chance_percent;
        let mut changed = 0;

        for entry in self.registry.iter_active_mut() {
            let low = self.random.chance(chance);
            if low == entry.unit().flags().low_battery {
                continue;
            }

            let address = LockAddress::from(&*entry);
            let before = entry.unit().snapshot();
            entry.unit_mut().set_low_battery(low, now);
            publish_changes(
                self.publisher.as_mut(),
                address,
                before,
                entry.unit().snapshot(),
            );
            changed += 1;
        }

        changed
    }

    // ------------------------------------------------------------------
    // Text commands
    // ------------------------------------------------------------------

    /// Parse and run one command line.
    pub fn execute_line(&mut self, line: &str) -> CommandReply {
        match line.parse::<BridgeCommand>() {
            Ok(command) => self.execute(command),
            Err(err) => CommandReply::from(err),
        }
    }

    /// Run one administrative command.
    pub fn execute(&mut self, command: BridgeCommand) -> CommandReply {
        debug!("Executing command: {}", command);

        let result = match command {
            BridgeCommand::Add { name } => self
                .add_lock(&name)
                .map(|slot| format!("Added lock {}: {}", slot, self.name_of(slot))),
            BridgeCommand::Remove(slot) => self
                .remove_lock(slot)
                .map(|name| format!("Removed lock {}: {}", slot, name)),
            BridgeCommand::Lock(slot) => self
                .lock(slot)
                .map(|()| format!("Locked {}", self.name_of(slot))),
            BridgeCommand::Unlock(slot) => self
                .unlock(slot)
                .map(|()| format!("Unlocked {}", self.name_of(slot))),
            BridgeCommand::Jam(slot) => self
                .set_jam(slot)
                .map(|()| format!("Set jam status for {}", self.name_of(slot))),
            BridgeCommand::Battery(slot) => self.toggle_low_battery(slot).map(|low| {
                let level = if low { "LOW" } else { "OK" };
                format!("Toggled low battery for {}: {}", self.name_of(slot), level)
            }),
            BridgeCommand::Clear(slot) => self
                .clear_errors(slot)
                .map(|()| format!("Cleared errors for {}", self.name_of(slot))),
            BridgeCommand::Target { slot, target } => {
                self.request_state(slot, target).map(|()| {
                    format!("{} moving to {}", self.name_of(slot), target)
                })
            }
            BridgeCommand::Identify(slot) => self
                .identify(slot)
                .map(|()| format!("Identifying {}", self.name_of(slot))),
            BridgeCommand::Status => Ok(self.status_report()),
            BridgeCommand::Help => Ok(HELP_TEXT.to_string()),
        };

        match result {
            Ok(message) => CommandReply::success(message),
            Err(err) => {
                warn!("Command failed: {}", err);
                CommandReply::from(err)
            }
        }
    }

    /// Full status table of the bridge.
    pub fn status_report(&self) -> String {
        const RULE: &str = "------------------------------------------------";

        let mut report = String::new();
        let _ = writeln!(report, "========== LOCK BRIDGE STATUS ==========");
        let _ = writeln!(
            report,
            "Active Locks: {} / {}",
            self.registry.active_count(),
            self.registry.capacity()
        );
        let _ = writeln!(report, "Bridge Endpoint ID: {}", BRIDGE_ENDPOINT_ID);
        let _ = writeln!(report, "{RULE}");

        for entry in self.registry.iter_active() {
            let unit = entry.unit();
            let indicator = unit.indicator();
            let _ = writeln!(report, "Lock {}: {}", entry.slot(), entry.name());
            let _ = writeln!(report, "  Endpoint ID: {}", entry.endpoint());
            let _ = writeln!(report, "  LED Pin: {}", indicator.pin_label());
            let _ = writeln!(report, "  Status: {}", unit.state_summary());
            let _ = writeln!(
                report,
                "  LED Status: {} ({})",
                indicator.level(),
                indicator.mode()
            );
            let _ = writeln!(report, "{RULE}");
        }

        report.push_str("========================================");
        report
    }

    fn resolve(&self, identity: LockIdentity) -> Result<SlotId> {
        self.registry.lookup_by_identity(&identity).ok_or_else(|| {
            warn!("Lock not found for {}", identity);
            Error::UnknownIdentity(identity.to_string())
        })
    }

    fn name_of(&self, slot: SlotId) -> String {
        self.registry
            .entry(slot)
            .map(|entry| entry.name().to_string())
            .unwrap_or_default()
    }

    /// Run `f` against an active lock and publish what changed.
    fn mutate<T, F>(&mut self, slot: SlotId, f: F) -> Result<T>
    where
        F: FnOnce(&mut LockUnit<P>, Instant) -> Result<T>,
    {
        let now = self.clock.now();
        let entry = self.registry.entry_mut(slot)?;
        let address = LockAddress::from(&*entry);
        let before = entry.unit().snapshot();

        let result = f(entry.unit_mut(), now);

        publish_changes(
            self.publisher.as_mut(),
            address,
            before,
            entry.unit().snapshot(),
        );
        result
    }
}

/// Report every externally visible difference between two snapshots.
///
/// A newly started operation always reports its target, even when the
/// target is unchanged.
fn publish_changes(
    publisher: &mut dyn StatePublisher,
    lock: LockAddress,
    before: LockSnapshot,
    after: LockSnapshot,
) {
    let started = after.busy && !before.busy;

    if before.target != after.target || started {
        publisher.publish_target_state(lock, after.target);
    }
    if before.current != after.current {
        publisher.publish_current_state(lock, after.current);
    }
    if before.flags != after.flags {
        publisher.publish_flags(lock, after.flags);
    }
}
