//! Journey cache and reconciliation.
//!
//! The cache holds every journey currently shown for a trip. Each successful
//! fetch replaces it with [`reconcile`]: the fresh journeys, plus a bounded
//! number of journeys that have already departed and are still underway.
//! Without the second part a rider watching their own train would see it
//! vanish from the list the moment the backend stops reporting it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Journey, JourneyKey};

/// How long after arrival a started journey stays visible.
pub const STARTED_RETENTION_THRESHOLD: Duration = Duration::minutes(10);

/// How many started journeys may be carried over between fetches.
pub const MAX_RETAINED_STARTED: usize = 2;

/// Immutable snapshot of the journeys shown for one trip.
///
/// Cloning is cheap. A mutation produces a new snapshot, so a reader
/// holding one never sees a half-merged state.
#[derive(Debug, Clone, Default)]
pub struct JourneyCache {
    journeys: Arc<HashMap<JourneyKey, Journey>>,
}

impl JourneyCache {
    /// An empty cache.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a cache from journeys. The first journey wins for a repeated key.
    pub fn from_journeys(journeys: impl IntoIterator<Item = Journey>) -> Self {
        let mut map = HashMap::new();
        for journey in journeys {
            map.entry(journey.key().clone()).or_insert(journey);
        }
        Self {
            journeys: Arc::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.journeys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journeys.is_empty()
    }

    pub fn get(&self, key: &JourneyKey) -> Option<&Journey> {
        self.journeys.get(key)
    }

    pub fn contains(&self, key: &JourneyKey) -> bool {
        self.journeys.contains_key(key)
    }

    /// Iterate journeys in no particular order.
    pub fn journeys(&self) -> impl Iterator<Item = &Journey> {
        self.journeys.values()
    }
}

/// Retention policy for started journeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Started journeys that arrived longer ago than this are evicted.
    pub started_retention_threshold: Duration,
    /// Upper bound on carried-over started journeys.
    pub max_retained_started: usize,
}

impl RetentionPolicy {
    pub fn new(started_retention_threshold: Duration, max_retained_started: usize) -> Self {
        Self {
            started_retention_threshold,
            max_retained_started,
        }
    }

    /// Reconcile using this policy.
    pub fn apply(
        &self,
        existing: &JourneyCache,
        fresh: Vec<Journey>,
        now: DateTime<Utc>,
    ) -> JourneyCache {
        reconcile(
            existing,
            fresh,
            now,
            self.started_retention_threshold,
            self.max_retained_started,
        )
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            started_retention_threshold: STARTED_RETENTION_THRESHOLD,
            max_retained_started: MAX_RETAINED_STARTED,
        }
    }
}

/// Merge a fresh fetch result with the journeys already in the cache.
///
/// Keeps every fresh journey, plus at most `max_retained_started` journeys
/// from `existing` that have started, arrived no earlier than
/// `now - started_retention_threshold`, and are not in `fresh`. When more
/// qualify, the ones departing latest win. Fresh data always takes
/// precedence over cached data for the same key.
///
/// # Examples
///
/// ```
/// use journey_refresh::reconcile::{JourneyCache, reconcile};
/// use chrono::{Duration, Utc};
///
/// let merged = reconcile(&JourneyCache::empty(), vec![], Utc::now(), Duration::minutes(10), 2);
/// assert!(merged.is_empty());
/// ```
pub fn reconcile(
    existing: &JourneyCache,
    fresh: Vec<Journey>,
    now: DateTime<Utc>,
    started_retention_threshold: Duration,
    max_retained_started: usize,
) -> JourneyCache {
    let fresh = JourneyCache::from_journeys(fresh);
    let expiry = now - started_retention_threshold;

    let mut in_flight: Vec<&Journey> = existing
        .journeys()
        .filter(|j| j.has_started(now))
        .filter(|j| j.destination_time() >= expiry)
        .filter(|j| !fresh.contains(j.key()))
        .collect();

    in_flight.sort_by(|a, b| {
        a.origin_time()
            .cmp(&b.origin_time())
            .then_with(|| a.key().cmp(b.key()))
    });
    let overflow = in_flight.len().saturating_sub(max_retained_started);

    if overflow == in_flight.len() {
        return fresh;
    }

    let mut merged: HashMap<JourneyKey, Journey> = (*fresh.journeys).clone();
    for journey in in_flight.into_iter().skip(overflow) {
        merged.insert(journey.key().clone(), journey.clone());
    }

    JourneyCache {
        journeys: Arc::new(merged),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{journey, now};

    fn policy() -> RetentionPolicy {
        RetentionPolicy::default()
    }

    fn keys(cache: &JourneyCache) -> Vec<String> {
        let mut keys: Vec<String> = cache.journeys().map(|j| j.key().to_string()).collect();
        keys.sort();
        keys
    }

    #[test]
    fn default_policy_uses_constants() {
        assert_eq!(policy().started_retention_threshold, Duration::minutes(10));
        assert_eq!(policy().max_retained_started, 2);
    }

    #[test]
    fn empty_existing_yields_fresh() {
        let fresh = vec![journey("J1", 5, 30)];
        let merged = policy().apply(&JourneyCache::empty(), fresh, now());

        assert_eq!(keys(&merged), vec!["J1"]);
    }

    #[test]
    fn in_flight_journey_retained() {
        let existing = JourneyCache::from_journeys([journey("J1", -2, -1)]);
        let merged = policy().apply(&existing, vec![journey("J2", 3, 20)], now());

        assert_eq!(keys(&merged), vec!["J1", "J2"]);
    }

    #[test]
    fn expired_journey_evicted() {
        let existing = JourneyCache::from_journeys([journey("J1", -30, -11)]);
        let merged = policy().apply(&existing, vec![journey("J2", 3, 20)], now());

        assert_eq!(keys(&merged), vec!["J2"]);
    }

    #[test]
    fn arrival_exactly_at_threshold_retained() {
        let existing = JourneyCache::from_journeys([journey("J1", -30, -10)]);
        let merged = policy().apply(&existing, vec![], now());

        assert_eq!(keys(&merged), vec!["J1"]);
    }

    #[test]
    fn overflow_keeps_latest_departures() {
        let existing = JourneyCache::from_journeys([
            journey("A", -20, 5),
            journey("B", -10, 15),
            journey("C", -5, 25),
        ]);
        let merged = policy().apply(&existing, vec![journey("F", 5, 30)], now());

        assert_eq!(keys(&merged), vec!["B", "C", "F"]);
    }

    #[test]
    fn upcoming_cached_journeys_dropped() {
        // Not started and no longer reported: the backend is authoritative.
        let existing = JourneyCache::from_journeys([journey("J1", 5, 30)]);
        let merged = policy().apply(&existing, vec![journey("J2", 10, 35)], now());

        assert_eq!(keys(&merged), vec!["J2"]);
    }

    #[test]
    fn fresh_wins_on_key_collision() {
        let mut cached = journey("J1", -2, 20);
        cached.set_display_time_text("stale");
        let existing = JourneyCache::from_journeys([cached]);

        let fresh = journey("J1", -1, 21);
        let merged = policy().apply(&existing, vec![fresh.clone()], now());

        assert_eq!(merged.len(), 1);
        let kept = merged.get(fresh.key()).unwrap();
        assert_eq!(kept.origin_time(), fresh.origin_time());
        assert_eq!(kept.display_time_text(), "");
    }

    #[test]
    fn empty_fresh_keeps_survivors_only() {
        let existing = JourneyCache::from_journeys([
            journey("gone", -40, -20),
            journey("riding", -3, 12),
            journey("later", 4, 30),
        ]);
        let merged = policy().apply(&existing, vec![], now());

        assert_eq!(keys(&merged), vec!["riding"]);
    }

    #[test]
    fn zero_retention_count_keeps_only_fresh() {
        let existing = JourneyCache::from_journeys([journey("riding", -3, 12)]);
        let merged = reconcile(
            &existing,
            vec![journey("J2", 3, 20)],
            now(),
            STARTED_RETENTION_THRESHOLD,
            0,
        );

        assert_eq!(keys(&merged), vec!["J2"]);
    }

    #[test]
    fn duplicate_fresh_keys_collapse() {
        let fresh = vec![journey("J1", 5, 30), journey("J1", 6, 31)];
        let merged = policy().apply(&JourneyCache::empty(), fresh, now());

        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged.journeys().next().unwrap().origin_time(),
            now() + Duration::minutes(5)
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::testing::{journey, now};
    use proptest::prelude::*;

    /// (departure offset, duration) in minutes relative to now.
    fn journey_specs(max: usize) -> impl Strategy<Value = Vec<(i64, i64)>> {
        prop::collection::vec((-90i64..90, 0i64..60), 0..max)
    }

    fn build(prefix: &str, specs: &[(i64, i64)]) -> Vec<Journey> {
        specs
            .iter()
            .enumerate()
            .map(|(i, (dep, dur))| journey(&format!("{prefix}{i}"), *dep, dep + dur))
            .collect()
    }

    proptest! {
        /// Property: every output journey is fresh, or started and not expired.
        #[test]
        fn output_is_fresh_or_live(
            existing in journey_specs(12),
            fresh in journey_specs(8),
            max_retained in 0usize..5,
        ) {
            // Overlapping prefixes exercise key collisions.
            let existing = JourneyCache::from_journeys(build("J", &existing));
            let fresh = build("J", &fresh);
            let fresh_cache = JourneyCache::from_journeys(fresh.clone());
            let threshold = STARTED_RETENTION_THRESHOLD;

            let merged = reconcile(&existing, fresh, now(), threshold, max_retained);

            for j in merged.journeys() {
                let live = j.has_started(now()) && j.destination_time() >= now() - threshold;
                prop_assert!(fresh_cache.contains(j.key()) || live);
            }
        }

        /// Property: output size is bounded by fresh size plus retention count.
        #[test]
        fn cardinality_bounded(
            existing in journey_specs(12),
            fresh in journey_specs(8),
            max_retained in 0usize..5,
        ) {
            let existing = JourneyCache::from_journeys(build("E", &existing));
            let fresh = build("F", &fresh);
            let fresh_len = fresh.len();

            let merged = reconcile(
                &existing,
                fresh,
                now(),
                STARTED_RETENTION_THRESHOLD,
                max_retained,
            );

            prop_assert!(merged.len() <= fresh_len + max_retained);
        }

        /// Property: re-merging the same fresh data is a no-op.
        #[test]
        fn idempotent(
            existing in journey_specs(12),
            fresh in journey_specs(8),
        ) {
            let existing = JourneyCache::from_journeys(build("J", &existing));
            let fresh = build("J", &fresh);
            let policy = RetentionPolicy::default();

            let once = policy.apply(&existing, fresh.clone(), now());
            let twice = policy.apply(&once, fresh, now());

            let mut a: Vec<_> = once.journeys().map(|j| j.key().clone()).collect();
            let mut b: Vec<_> = twice.journeys().map(|j| j.key().clone()).collect();
            a.sort();
            b.sort();
            prop_assert_eq!(a, b);
        }

        /// Property: every fresh journey survives reconciliation.
        #[test]
        fn fresh_always_kept(
            existing in journey_specs(12),
            fresh in journey_specs(8),
        ) {
            let existing = JourneyCache::from_journeys(build("E", &existing));
            let fresh = build("F", &fresh);
            let merged = RetentionPolicy::default().apply(&existing, fresh.clone(), now());

            for j in &fresh {
                prop_assert!(merged.contains(j.key()));
            }
        }
    }
}
