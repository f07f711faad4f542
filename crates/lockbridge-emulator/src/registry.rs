//! Fixed-capacity registry of lock slots.
//!
//! The registry is built from one output pin per slot. A vacant slot keeps
//! its pin parked inside a stopped [`StatusIndicator`]; adding a lock moves
//! that indicator into a fresh [`LockUnit`], and removing the lock stops the
//! indicator and parks it again.

use std::time::Instant;

use lockbridge_core::constants::MAX_SUPPORTED_LOCKS;
use lockbridge_core::{
    AccessoryIndex, BridgeConfig, EndpointId, Error, LockIdentity, LockName, Result, SlotId,
};
use lockbridge_hardware::OutputPin;
use tracing::{debug, info};

use crate::indicator::StatusIndicator;
use crate::lock_unit::{LockSettings, LockUnit};

/// An occupied slot: the lock, its name and its bridge endpoint.
#[derive(Debug)]
pub struct LockEntry<P> {
    slot: SlotId,
    name: LockName,
    endpoint: EndpointId,
    unit: LockUnit<P>,
}

impl<P: OutputPin> LockEntry<P> {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn name(&self) -> &LockName {
        &self.name
    }

    pub fn endpoint(&self) -> EndpointId {
        self.endpoint
    }

    /// Accessory index, equal to the slot index.
    pub fn accessory(&self) -> AccessoryIndex {
        AccessoryIndex::from(self.slot)
    }

    /// Returns `true` if `identity` addresses this lock.
    pub fn matches(&self, identity: &LockIdentity) -> bool {
        match identity {
            LockIdentity::Endpoint(endpoint) => *endpoint == self.endpoint,
            LockIdentity::Accessory(index) => *index == self.accessory(),
        }
    }

    pub fn unit(&self) -> &LockUnit<P> {
        &self.unit
    }

    pub fn unit_mut(&mut self) -> &mut LockUnit<P> {
        &mut self.unit
    }
}

/// Registry of lock slots.
///
/// Slots are indexed by [`SlotId`]. Each index holds either an active
/// [`LockEntry`] or a parked indicator, never both.
///
/// # Examples
///
/// ```
/// use std::time::Instant;
/// use lockbridge_core::EndpointId;
/// use lockbridge_emulator::{LockRegistry, LockSettings};
/// use lockbridge_hardware::mock::MockPin;
///
/// let (pins, _leds) = MockPin::bank(2);
/// let mut registry = LockRegistry::new(pins, LockSettings::default(), EndpointId::new(1))?;
///
/// let slot = registry.add("Front Door", Instant::now())?;
/// assert_eq!(slot.index(), 0);
/// assert_eq!(registry.active_count(), 1);
/// # Ok::<(), lockbridge_core::Error>(())
/// ```
#[derive(Debug)]
pub struct LockRegistry<P> {
    slots: Vec<Option<LockEntry<P>>>,
    parked: Vec<Option<StatusIndicator<P>>>,
    settings: LockSettings,
    next_endpoint: Option<u16>,
}

impl<P: OutputPin> LockRegistry<P> {
    /// Create a registry with one slot per pin.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no pins are given, more pins than supported
    /// slots are given, or `first_endpoint` is the bridge root endpoint.
    pub fn new(pins: Vec<P>, settings: LockSettings, first_endpoint: EndpointId) -> Result<Self> {
        if pins.is_empty() || pins.len() > MAX_SUPPORTED_LOCKS {
            return Err(Error::Config(format!(
                "registry needs 1-{MAX_SUPPORTED_LOCKS} pins, got {}",
                pins.len()
            )));
        }
        if first_endpoint.as_u16() == 0 {
            return Err(Error::Config(
                "first endpoint id must not be the bridge endpoint".to_string(),
            ));
        }

        let parked: Vec<_> = pins
            .into_iter()
            .map(|pin| Some(StatusIndicator::new(pin)))
            .collect();
        let slots = parked.iter().map(|_| None).collect();

        Ok(Self {
            slots,
            parked,
            settings,
            next_endpoint: Some(first_endpoint.as_u16()),
        })
    }

    /// Create a registry sized by `config.max_locks`, ignoring extra pins.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if fewer than `max_locks` pins are given.
    pub fn from_config(pins: Vec<P>, config: &BridgeConfig) -> Result<Self> {
        if pins.len() < config.max_locks {
            return Err(Error::Config(format!(
                "{} pins given but max_locks is {}",
                pins.len(),
                config.max_locks
            )));
        }

        let pins = pins.into_iter().take(config.max_locks).collect();
        Self::new(
            pins,
            LockSettings::from(config),
            EndpointId::new(config.first_endpoint_id),
        )
    }

    /// Add a lock in the lowest free slot.
    ///
    /// An empty name falls back to `Lock_<n>`; long names are truncated.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapacityExceeded` when every slot is occupied and
    /// `Error::EndpointsExhausted` when no endpoint id is left to assign.
    pub fn add(&mut self, name: &str, now: Instant) -> Result<SlotId> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::CapacityExceeded {
                capacity: self.capacity(),
            })?;
        let slot = SlotId::new(index)?;
        let endpoint = self.next_endpoint.ok_or(Error::EndpointsExhausted)?;
        let indicator = self.parked[index]
            .take()
            .ok_or_else(|| Error::InvalidTransition {
                slot,
                reason: "no indicator parked in vacant slot".to_string(),
            })?;

        self.next_endpoint = endpoint.checked_add(1);

        let name = match LockName::new(name) {
            name if name.is_empty() => LockName::default_for(slot),
            name => name,
        };

        info!(
            "Added lock '{}' in slot {} (endpoint {}, LED {})",
            name,
            slot,
            endpoint,
            indicator.pin_label()
        );

        self.slots[index] = Some(LockEntry {
            slot,
            name,
            endpoint: EndpointId::new(endpoint),
            unit: LockUnit::new(slot, self.settings, indicator, now),
        });

        Ok(slot)
    }

    /// Remove the lock in `slot`, returning its name.
    ///
    /// Any in-flight operation is abandoned and the indicator is stopped
    /// before the slot is freed.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownSlot` if the slot is out of range or vacant.
    pub fn remove(&mut self, slot: SlotId) -> Result<LockName> {
        let entry = self
            .slots
            .get_mut(slot.index())
            .and_then(Option::take)
            .ok_or(Error::UnknownSlot(slot.number()))?;

        let LockEntry { name, mut unit, .. } = entry;
        if unit.cancel_operation() {
            debug!("Lock {} operation cancelled on removal", slot);
        }

        let mut indicator = unit.into_indicator();
        indicator.stop();
        self.parked[slot.index()] = Some(indicator);

        info!("Removed lock '{}' from slot {}", name, slot);
        Ok(name)
    }

    /// Resolve an external identity to the slot it addresses.
    pub fn lookup_by_identity(&self, identity: &LockIdentity) -> Option<SlotId> {
        self.iter_active()
            .find(|entry| entry.matches(identity))
            .map(LockEntry::slot)
    }

    pub fn lookup_by_slot(&self, slot: SlotId) -> Option<&LockUnit<P>> {
        self.entry(slot).map(LockEntry::unit)
    }

    pub fn entry(&self, slot: SlotId) -> Option<&LockEntry<P>> {
        self.slots.get(slot.index()).and_then(Option::as_ref)
    }

    /// Mutable access to an active slot.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownSlot` if the slot is out of range or vacant.
    pub fn entry_mut(&mut self, slot: SlotId) -> Result<&mut LockEntry<P>> {
        self.slots
            .get_mut(slot.index())
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownSlot(slot.number()))
    }

    /// Visit active locks in ascending slot order.
    pub fn for_each_active<F>(&self, mut f: F)
    where
        F: FnMut(&LockEntry<P>),
    {
        self.iter_active().for_each(|entry| f(entry));
    }

    /// Visit active locks mutably in ascending slot order.
    pub fn for_each_active_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut LockEntry<P>),
    {
        self.iter_active_mut().for_each(|entry| f(entry));
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &LockEntry<P>> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut LockEntry<P>> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    pub fn active_count(&self) -> usize {
        self.iter_active().count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.active_count() == self.capacity()
    }

    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    /// Indicator parked in a vacant slot.
    pub fn parked_indicator(&self, slot: SlotId) -> Option<&StatusIndicator<P>> {
        self.parked.get(slot.index()).and_then(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::IndicatorMode;
    use lockbridge_core::{LockFlags, LockState, ScriptedRandom, TargetState};
    use lockbridge_hardware::PinLevel;
    use lockbridge_hardware::mock::{MockPin, MockPinHandle};
    use rstest::rstest;
    use std::time::Duration;

    fn registry(capacity: usize) -> (LockRegistry<MockPin>, Vec<MockPinHandle>) {
        let (pins, handles) = MockPin::bank(capacity);
        let registry = LockRegistry::new(pins, LockSettings::default(), EndpointId::new(1)).unwrap();
        (registry, handles)
    }

    #[test]
    fn test_new_registry_is_empty() {
        let (registry, handles) = registry(8);

        assert_eq!(registry.capacity(), 8);
        assert_eq!(registry.active_count(), 0);
        assert!(!registry.is_full());
        assert!(handles.iter().all(|h| h.level() == PinLevel::Low));
    }

    #[test]
    fn test_new_rejects_bad_parameters() {
        let result = LockRegistry::<MockPin>::new(Vec::new(), LockSettings::default(), EndpointId::new(1));
        assert!(matches!(result, Err(Error::Config(_))));

        let (pins, _) = MockPin::bank(2);
        let result = LockRegistry::new(pins, LockSettings::default(), EndpointId::new(0));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_config_uses_max_locks() {
        let config = BridgeConfig {
            max_locks: 3,
            first_endpoint_id: 10,
            ..BridgeConfig::default()
        };
        let (pins, _) = MockPin::bank(8);
        let mut registry = LockRegistry::from_config(pins, &config).unwrap();

        assert_eq!(registry.capacity(), 3);
        let slot = registry.add("Shed", Instant::now()).unwrap();
        assert_eq!(registry.entry(slot).unwrap().endpoint(), EndpointId::new(10));
    }

    #[test]
    fn test_add_allocates_lowest_free_slot() {
        let (mut registry, _) = registry(4);
        let now = Instant::now();

        let a = registry.add("Front Door", now).unwrap();
        let b = registry.add("Back Door", now).unwrap();
        let c = registry.add("Garage Door", now).unwrap();
        assert_eq!((a.index(), b.index(), c.index()), (0, 1, 2));

        registry.remove(b).unwrap();
        let d = registry.add("Side Gate", now).unwrap();
        assert_eq!(d.index(), 1);
        assert_eq!(registry.entry(d).unwrap().name().as_str(), "Side Gate");
    }

    #[test]
    fn test_add_beyond_capacity() {
        let (mut registry, _) = registry(2);
        let now = Instant::now();

        registry.add("a", now).unwrap();
        registry.add("b", now).unwrap();
        let result = registry.add("c", now);

        assert!(matches!(result, Err(Error::CapacityExceeded { capacity: 2 })));
        assert_eq!(registry.active_count(), 2);
        assert!(registry.is_full());
    }

    #[rstest]
    #[case("", "Lock_1")]
    #[case("   ", "Lock_1")]
    #[case("  Porch  ", "Porch")]
    #[case(
        "A Very Long Lock Name That Keeps Going",
        "A Very Long Lock Name That Keep"
    )]
    fn test_add_names(#[case] input: &str, #[case] expected: &str) {
        let (mut registry, _) = registry(1);
        let slot = registry.add(input, Instant::now()).unwrap();
        assert_eq!(registry.entry(slot).unwrap().name().as_str(), expected);
    }

    #[test]
    fn test_endpoint_ids_are_never_reused() {
        let (mut registry, _) = registry(2);
        let now = Instant::now();

        let a = registry.add("a", now).unwrap();
        assert_eq!(registry.entry(a).unwrap().endpoint(), EndpointId::new(1));

        registry.remove(a).unwrap();
        let b = registry.add("b", now).unwrap();

        assert_eq!(a, b);
        assert_eq!(registry.entry(b).unwrap().endpoint(), EndpointId::new(2));
        assert_eq!(
            registry.lookup_by_identity(&LockIdentity::Endpoint(EndpointId::new(1))),
            None
        );
    }

    #[test]
    fn test_endpoint_exhaustion() {
        let (pins, _) = MockPin::bank(3);
        let mut registry =
            LockRegistry::new(pins, LockSettings::default(), EndpointId::new(u16::MAX)).unwrap();
        let now = Instant::now();

        registry.add("last", now).unwrap();
        let result = registry.add("none left", now);

        assert!(matches!(result, Err(Error::EndpointsExhausted)));
        assert_eq!(registry.active_count(), 1);
        assert!(registry.parked_indicator(SlotId::new(1).unwrap()).is_some());
    }

    #[test]
    fn test_lookup_by_identity() {
        let (mut registry, _) = registry(4);
        let now = Instant::now();

        registry.add("a", now).unwrap();
        let b = registry.add("b", now).unwrap();

        assert_eq!(
            registry.lookup_by_identity(&LockIdentity::Endpoint(EndpointId::new(2))),
            Some(b)
        );
        assert_eq!(
            registry.lookup_by_identity(&LockIdentity::Accessory(AccessoryIndex::new(1))),
            Some(b)
        );
        assert_eq!(
            registry.lookup_by_identity(&LockIdentity::Accessory(AccessoryIndex::new(3))),
            None
        );
        assert_eq!(
            registry.lookup_by_identity(&LockIdentity::Endpoint(EndpointId::new(99))),
            None
        );
    }

    #[test]
    fn test_lookup_by_slot_unknown() {
        let (mut registry, _) = registry(2);
        registry.add("a", Instant::now()).unwrap();

        assert!(registry.lookup_by_slot(SlotId::new(0).unwrap()).is_some());
        assert!(registry.lookup_by_slot(SlotId::new(1).unwrap()).is_none());
        assert!(registry.lookup_by_slot(SlotId::new(31).unwrap()).is_none());
    }

    #[test]
    fn test_unknown_slot_errors() {
        let (mut registry, _) = registry(2);
        let vacant = SlotId::new(1).unwrap();
        let out_of_range = SlotId::new(20).unwrap();

        assert!(matches!(registry.remove(vacant), Err(Error::UnknownSlot(_))));
        assert!(matches!(registry.remove(out_of_range), Err(Error::UnknownSlot(_))));
        assert!(matches!(registry.entry_mut(vacant), Err(Error::UnknownSlot(_))));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_remove_stops_indicator_and_cancels_operation() {
        let (mut registry, handles) = registry(2);
        let now = Instant::now();
        let slot = registry.add("Front Door", now).unwrap();

        let unit = registry.entry_mut(slot).unwrap().unit_mut();
        unit.set_jammed(now).unwrap();
        unit.clear_errors(now);
        unit.set_low_battery(true, now);
        unit.request_state(TargetState::Secured, now).unwrap();
        assert_eq!(handles[0].level(), PinLevel::High);

        let name = registry.remove(slot).unwrap();
        assert_eq!(name.as_str(), "Front Door");
        assert_eq!(handles[0].level(), PinLevel::Low);

        let parked = registry.parked_indicator(slot).unwrap();
        assert_eq!(parked.mode(), IndicatorMode::Off);
        assert!(!parked.is_blinking());
    }

    #[test]
    fn test_re_added_slot_has_fresh_state() {
        let (mut registry, handles) = registry(1);
        let now = Instant::now();
        let slot = registry.add("a", now).unwrap();

        let unit = registry.entry_mut(slot).unwrap().unit_mut();
        unit.set_low_battery(true, now);
        unit.set_jammed(now).unwrap();

        registry.remove(slot).unwrap();
        handles[0].reset_counts();
        registry.add("b", now).unwrap();

        let unit = registry.lookup_by_slot(slot).unwrap();
        assert_eq!(unit.current_state(), LockState::Unsecured);
        assert_eq!(unit.flags(), LockFlags::default());
        assert!(!unit.is_busy());
        assert_eq!(unit.indicator().mode(), IndicatorMode::Off);
        assert_eq!(handles[0].level(), PinLevel::Low);
    }

    #[test]
    fn test_removed_slot_no_longer_blinks() {
        let (mut registry, handles) = registry(1);
        let now = Instant::now();
        let slot = registry.add("a", now).unwrap();
        registry.entry_mut(slot).unwrap().unit_mut().set_jammed(now).unwrap();
        registry.remove(slot).unwrap();
        handles[0].reset_counts();

        let mut random = ScriptedRandom::always_succeed();
        registry.for_each_active_mut(|entry| {
            entry.unit_mut().tick(now + Duration::from_secs(1), &mut random);
        });

        assert_eq!(handles[0].write_count(), 0);
    }

    #[test]
    fn test_for_each_active_ascending_order() {
        let (mut registry, _) = registry(5);
        let now = Instant::now();
        for name in ["a", "b", "c", "d"] {
            registry.add(name, now).unwrap();
        }
        registry.remove(SlotId::new(1).unwrap()).unwrap();

        let mut visited = Vec::new();
        registry.for_each_active(|entry| visited.push(entry.slot().index()));

        assert_eq!(visited, vec![0, 2, 3]);
    }
}
