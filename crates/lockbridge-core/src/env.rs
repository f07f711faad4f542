//! Environment abstractions for deterministic testing.
//!
//! Lock operations take observable time and may fail at random. Both inputs
//! are injected through the traits in this module so the state machine never
//! reads the system clock or a global RNG directly:
//!
//! - [`Clock`] supplies the current time. [`SystemClock`] reads the monotonic
//!   clock, [`ManualClock`] is advanced explicitly by tests.
//! - [`RandomSource`] supplies uniform percentage rolls. [`ThreadRandom`] is
//!   the production source, [`SeededRandom`] is reproducible, and
//!   [`ScriptedRandom`] replays fixed rolls so a test can force an outcome.
//!
//! # Invariants
//!
//! - `Clock::now()` never goes backwards.
//! - `RandomSource::roll_percent()` always returns a value in `0..100`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::PERCENT_ROLL_RANGE;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Source of uniformly distributed percentage rolls.
pub trait RandomSource: Send {
    /// Draw a value in `0..100`.
    fn roll_percent(&mut self) -> u32;

    /// Returns `true` with the given percent chance.
    fn chance(&mut self, percent: u32) -> bool {
        self.roll_percent() < percent
    }
}

/// Clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle while the
/// component under test owns another.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lockbridge_core::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_millis(1500));
/// assert_eq!(clock.now() - start, Duration::from_millis(1500));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Random source backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn roll_percent(&mut self) -> u32 {
        rand::thread_rng().gen_range(0..PERCENT_ROLL_RANGE)
    }
}

/// Reproducible random source seeded from a `u64`.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn roll_percent(&mut self) -> u32 {
        self.rng.gen_range(0..PERCENT_ROLL_RANGE)
    }
}

/// Random source that replays queued rolls, then repeats a fallback roll.
///
/// Clones share the queue, so a test can push rolls after handing the source over.
///
/// # Examples
///
/// ```
/// use lockbridge_core::{RandomSource, ScriptedRandom};
///
/// let mut random = ScriptedRandom::new(99);
/// random.push(0);
/// assert_eq!(random.roll_percent(), 0);
/// assert_eq!(random.roll_percent(), 99);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    rolls: Arc<Mutex<VecDeque<u32>>>,
    fallback: u32,
}

impl ScriptedRandom {
    /// Create a scripted source whose rolls default to `fallback`.
    ///
    /// The fallback is clamped into `0..100`.
    pub fn new(fallback: u32) -> Self {
        Self {
            rolls: Arc::new(Mutex::new(VecDeque::new())),
            fallback: fallback.min(PERCENT_ROLL_RANGE - 1),
        }
    }

    /// Source that never triggers a jam, fault or low battery.
    pub fn always_succeed() -> Self {
        Self::new(PERCENT_ROLL_RANGE - 1)
    }

    /// Queue a roll. Values outside `0..100` are clamped.
    pub fn push(&self, roll: u32) {
        self.rolls.lock().push_back(roll.min(PERCENT_ROLL_RANGE - 1));
    }

    /// Number of queued rolls not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rolls.lock().len()
    }
}

impl RandomSource for ScriptedRandom {
    fn roll_percent(&mut self) -> u32 {
        self.rolls.lock().pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let start = clock.now();

        other.advance(Duration::from_millis(250));
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn test_seeded_random_reproducible() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        for _ in 0..100 {
            assert_eq!(a.roll_percent(), b.roll_percent());
        }
    }

    #[test]
    fn test_rolls_in_range() {
        let mut seeded = SeededRandom::new(7);
        let mut thread = ThreadRandom;
        for _ in 0..1000 {
            assert!(seeded.roll_percent() < PERCENT_ROLL_RANGE);
            assert!(thread.roll_percent() < PERCENT_ROLL_RANGE);
        }
    }

    #[test]
    fn test_scripted_random_replays_then_falls_back() {
        let mut random = ScriptedRandom::new(50);
        random.push(1);
        random.push(500);

        assert_eq!(random.remaining(), 2);
        assert_eq!(random.roll_percent(), 1);
        assert_eq!(random.roll_percent(), 99);
        assert_eq!(random.roll_percent(), 50);
        assert_eq!(random.remaining(), 0);
    }

    #[test]
    fn test_chance() {
        let mut random = ScriptedRandom::new(99);
        random.push(1);
        random.push(2);

        assert!(random.chance(2));
        assert!(!random.chance(2));
        assert!(!random.chance(0));
    }

    #[test]
    fn test_always_succeed_never_hits_chance() {
        let mut random = ScriptedRandom::always_succeed();
        for _ in 0..10 {
            assert!(!random.chance(99));
        }
    }
}
