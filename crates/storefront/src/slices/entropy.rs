//! Injectable time and randomness for generated ids and demo timestamps.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// How far back a backdated creation timestamp may reach.
pub const BACKDATE_WINDOW_DAYS: i64 = 5 * 365;

/// Every id up to `i64::MAX` is already taken, so no id can be strictly
/// greater than the ones held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no identifiers left above {floor}")]
pub struct IdsExhausted {
    pub floor: i64,
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clock, random source and id counter shared by the slices of one context.
pub struct Entropy {
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    last_id: Mutex<i64>,
}

impl Entropy {
    /// Wall clock and an OS-seeded generator.
    #[must_use]
    pub fn system() -> Self {
        Self::with_rng(Arc::new(SystemClock), StdRng::from_os_rng())
    }

    /// Deterministic generator for tests and reproducible demos.
    #[must_use]
    pub fn seeded(clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self::with_rng(clock, StdRng::seed_from_u64(seed))
    }

    fn with_rng(clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        Self {
            clock,
            rng: Mutex::new(rng),
            last_id: Mutex::new(0),
        }
    }

    /// Current instant according to the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// A new id: the current time in milliseconds, bumped past every id
    /// handed out or observed so far.
    ///
    /// # Errors
    ///
    /// Returns [`IdsExhausted`] once `i64::MAX` has been handed out or
    /// observed.
    pub fn next_id(&self) -> Result<i64, IdsExhausted> {
        let now = self.clock.now().timestamp_millis();
        let mut last = self.last_id.lock().unwrap_or_else(PoisonError::into_inner);
        let floor = last.checked_add(1).ok_or(IdsExhausted { floor: *last })?;
        let id = now.max(floor);
        *last = id;
        Ok(id)
    }

    /// Never hand out an id at or below `id`.
    pub fn observe(&self, id: i64) {
        let mut last = self.last_id.lock().unwrap_or_else(PoisonError::into_inner);
        *last = (*last).max(id);
    }

    /// A uniformly random instant in the last [`BACKDATE_WINDOW_DAYS`] days.
    pub fn backdated_timestamp(&self) -> DateTime<Utc> {
        let window_ms = Duration::days(BACKDATE_WINDOW_DAYS).num_milliseconds();
        let offset = self.rng().random_range(0..window_ms);
        self.clock.now() - Duration::milliseconds(offset)
    }

    /// Fair coin.
    pub fn coin_flip(&self) -> bool {
        self.rng().random_bool(0.5)
    }

    fn rng(&self) -> std::sync::MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Entropy {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Entropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entropy")
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_next_id_uses_clock_millis() {
        let entropy = Entropy::seeded(Arc::new(FixedClock::new(at())), 1);
        assert_eq!(entropy.next_id().unwrap(), at().timestamp_millis());
    }

    #[test]
    fn test_next_id_is_strictly_increasing_on_a_frozen_clock() {
        let entropy = Entropy::seeded(Arc::new(FixedClock::new(at())), 1);
        let a = entropy.next_id().unwrap();
        let b = entropy.next_id().unwrap();
        let c = entropy.next_id().unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_observe_sets_floor() {
        let entropy = Entropy::seeded(Arc::new(FixedClock::new(at())), 1);
        let floor = at().timestamp_millis() + 10_000;
        entropy.observe(floor);
        assert_eq!(entropy.next_id().unwrap(), floor + 1);

        // Lower observations never move the floor back.
        entropy.observe(1);
        assert_eq!(entropy.next_id().unwrap(), floor + 2);
    }

    #[test]
    fn test_max_id_exhausts_instead_of_wrapping() {
        let entropy = Entropy::seeded(Arc::new(FixedClock::new(at())), 1);
        entropy.observe(i64::MAX - 1);
        assert_eq!(entropy.next_id().unwrap(), i64::MAX);
        assert_eq!(
            entropy.next_id().unwrap_err(),
            IdsExhausted { floor: i64::MAX }
        );

        let entropy = Entropy::seeded(Arc::new(FixedClock::new(at())), 1);
        entropy.observe(i64::MAX);
        assert!(entropy.next_id().is_err());
    }

    #[test]
    fn test_clock_moving_forward_wins() {
        let clock = Arc::new(FixedClock::new(at()));
        let entropy = Entropy::seeded(clock.clone(), 1);
        entropy.next_id().unwrap();
        clock.advance(Duration::seconds(5));
        assert_eq!(
            entropy.next_id().unwrap(),
            (at() + Duration::seconds(5)).timestamp_millis()
        );
    }

    #[test]
    fn test_backdated_timestamps_stay_in_window() {
        let entropy = Entropy::seeded(Arc::new(FixedClock::new(at())), 7);
        let oldest = at() - Duration::days(BACKDATE_WINDOW_DAYS);
        for _ in 0..1_000 {
            let ts = entropy.backdated_timestamp();
            assert!(ts > oldest, "{ts} older than five years");
            assert!(ts <= at(), "{ts} in the future");
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = Entropy::seeded(Arc::new(FixedClock::new(at())), 42);
        let b = Entropy::seeded(Arc::new(FixedClock::new(at())), 42);
        for _ in 0..16 {
            assert_eq!(a.coin_flip(), b.coin_flip());
            assert_eq!(a.backdated_timestamp(), b.backdated_timestamp());
        }
    }

    #[test]
    fn test_coin_flip_produces_both_sides() {
        let entropy = Entropy::seeded(Arc::new(FixedClock::new(at())), 3);
        let heads = (0..200).filter(|_| entropy.coin_flip()).count();
        assert!(heads > 0 && heads < 200);
    }
}
