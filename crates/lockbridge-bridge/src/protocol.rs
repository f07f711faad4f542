//! Outbound interface to the protocol layers.
//!
//! The bridge never talks to the accessory or device-bridging stacks
//! directly. Whenever a lock's externally visible fields change, the
//! dispatcher reports the change through a [`StatePublisher`], addressed by
//! a [`LockAddress`] that carries every identity the lock is known by.

use std::sync::Arc;

use lockbridge_core::{AccessoryIndex, EndpointId, LockFlags, LockState, SlotId, TargetState};
use lockbridge_emulator::LockEntry;
use lockbridge_hardware::OutputPin;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Every identity of one bridged lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockAddress {
    pub slot: SlotId,
    pub endpoint: EndpointId,
    pub accessory: AccessoryIndex,
}

impl<P: OutputPin> From<&LockEntry<P>> for LockAddress {
    fn from(entry: &LockEntry<P>) -> Self {
        Self {
            slot: entry.slot(),
            endpoint: entry.endpoint(),
            accessory: entry.accessory(),
        }
    }
}

/// Sink for externally visible lock changes.
pub trait StatePublisher: Send {
    /// The lock's current state changed.
    fn publish_current_state(&mut self, lock: LockAddress, state: LockState);

    /// The lock accepted a new target state.
    fn publish_target_state(&mut self, lock: LockAddress, target: TargetState);

    /// One or more of the jammed, faulted or low battery flags changed.
    fn publish_flags(&mut self, lock: LockAddress, flags: LockFlags);

    /// A lock was added and should be exposed.
    fn publish_added(&mut self, _lock: LockAddress, _name: &str) {}

    /// A lock was removed and should no longer be exposed.
    fn publish_removed(&mut self, _lock: LockAddress) {}
}

/// Publisher that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl StatePublisher for TracingPublisher {
    fn publish_current_state(&mut self, lock: LockAddress, state: LockState) {
        info!(
            "Lock {} (endpoint {}) current state: {}",
            lock.slot, lock.endpoint, state
        );
    }

    fn publish_target_state(&mut self, lock: LockAddress, target: TargetState) {
        debug!(
            "Lock {} (endpoint {}) target state: {}",
            lock.slot, lock.endpoint, target
        );
    }

    fn publish_flags(&mut self, lock: LockAddress, flags: LockFlags) {
        debug!(
            "Lock {} (endpoint {}) flags: jammed={} faulted={} low_battery={}",
            lock.slot, lock.endpoint, flags.jammed, flags.faulted, flags.low_battery
        );
    }

    fn publish_added(&mut self, lock: LockAddress, name: &str) {
        debug!("Exposing lock {} '{}' on endpoint {}", lock.slot, name, lock.endpoint);
    }

    fn publish_removed(&mut self, lock: LockAddress) {
        debug!("Withdrawing lock {} from endpoint {}", lock.slot, lock.endpoint);
    }
}

/// One published change, as captured by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PublishedEvent {
    CurrentState { lock: LockAddress, state: LockState },
    TargetState { lock: LockAddress, target: TargetState },
    Flags { lock: LockAddress, flags: LockFlags },
    Added { lock: LockAddress, name: String },
    Removed { lock: LockAddress },
}

impl PublishedEvent {
    pub fn slot(&self) -> SlotId {
        match self {
            PublishedEvent::CurrentState { lock, .. }
            | PublishedEvent::TargetState { lock, .. }
            | PublishedEvent::Flags { lock, .. }
            | PublishedEvent::Added { lock, .. }
            | PublishedEvent::Removed { lock } => lock.slot,
        }
    }
}

/// Publisher that records every event in a shared log.
///
/// Clones share the log, so a test can keep one clone while the dispatcher
/// owns another.
///
/// # Examples
///
/// ```
/// use lockbridge_bridge::protocol::{LockAddress, RecordingPublisher, StatePublisher};
/// use lockbridge_core::{AccessoryIndex, EndpointId, LockState, SlotId};
///
/// let recorder = RecordingPublisher::new();
/// let mut publisher = recorder.clone();
///
/// let slot = SlotId::new(0).unwrap();
/// let lock = LockAddress { slot, endpoint: EndpointId::new(1), accessory: AccessoryIndex::from(slot) };
/// publisher.publish_current_state(lock, LockState::Secured);
///
/// assert_eq!(recorder.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<PublishedEvent>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far.
    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events.lock().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<PublishedEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    fn record(&self, event: PublishedEvent) {
        self.events.lock().push(event);
    }
}

impl StatePublisher for RecordingPublisher {
    fn publish_current_state(&mut self, lock: LockAddress, state: LockState) {
        self.record(PublishedEvent::CurrentState { lock, state });
    }

    fn publish_target_state(&mut self, lock: LockAddress, target: TargetState) {
        self.record(PublishedEvent::TargetState { lock, target });
    }

    fn publish_flags(&mut self, lock: LockAddress, flags: LockFlags) {
        self.record(PublishedEvent::Flags { lock, flags });
    }

    fn publish_added(&mut self, lock: LockAddress, name: &str) {
        self.record(PublishedEvent::Added {
            lock,
            name: name.to_string(),
        });
    }

    fn publish_removed(&mut self, lock: LockAddress) {
        self.record(PublishedEvent::Removed { lock });
    }
}
