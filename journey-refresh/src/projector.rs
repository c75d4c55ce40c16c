//! Display projection of the journey cache.

use chrono::{DateTime, Utc};

use crate::domain::Journey;
use crate::reconcile::JourneyCache;

/// Text shown once a journey's departure time has passed.
pub const DEPARTED_TEXT: &str = "Departed";

/// Text shown when departure is less than a minute away.
pub const NOW_TEXT: &str = "Now";

/// Derive the display-ready journey list.
///
/// Every journey gets a fresh `display_time_text` for `now`, and the list is
/// sorted by departure with ties broken by key.
pub fn project(cache: &JourneyCache, now: DateTime<Utc>) -> Vec<Journey> {
    let mut journeys: Vec<Journey> = cache
        .journeys()
        .map(|j| {
            let mut j = j.clone();
            j.set_display_time_text(display_time_text(j.origin_time(), now));
            j
        })
        .collect();

    journeys.sort_by(|a, b| {
        a.origin_time()
            .cmp(&b.origin_time())
            .then_with(|| a.key().cmp(b.key()))
    });

    journeys
}

/// Humanize the time from `now` until `departure`.
///
/// # Examples
///
/// ```
/// use journey_refresh::projector::display_time_text;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// assert_eq!(display_time_text(now + Duration::minutes(5), now), "5 min");
/// assert_eq!(display_time_text(now + Duration::minutes(130), now), "2h 10m");
/// assert_eq!(display_time_text(now - Duration::minutes(1), now), "Departed");
/// ```
pub fn display_time_text(departure: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let until = departure.signed_duration_since(now);

    if until.num_seconds() <= 0 {
        return DEPARTED_TEXT.to_string();
    }

    let mins = until.num_minutes();
    if mins < 1 {
        return NOW_TEXT.to_string();
    }
    if mins < 60 {
        return format!("{mins} min");
    }

    let (hours, mins) = (mins / 60, mins % 60);
    if mins == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {mins}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{journey, now};
    use chrono::Duration;

    #[test]
    fn text_for_departed() {
        assert_eq!(display_time_text(now(), now()), "Departed");
        assert_eq!(
            display_time_text(now() - Duration::minutes(3), now()),
            "Departed"
        );
    }

    #[test]
    fn text_under_a_minute() {
        assert_eq!(
            display_time_text(now() + Duration::seconds(40), now()),
            "Now"
        );
    }

    #[test]
    fn text_minutes() {
        assert_eq!(display_time_text(now() + Duration::minutes(1), now()), "1 min");
        assert_eq!(
            display_time_text(now() + Duration::seconds(5 * 60 + 59), now()),
            "5 min"
        );
        assert_eq!(
            display_time_text(now() + Duration::minutes(59), now()),
            "59 min"
        );
    }

    #[test]
    fn text_hours() {
        assert_eq!(display_time_text(now() + Duration::minutes(60), now()), "1h");
        assert_eq!(
            display_time_text(now() + Duration::minutes(130), now()),
            "2h 10m"
        );
    }

    #[test]
    fn project_sorts_and_labels() {
        let cache = JourneyCache::from_journeys([
            journey("late", 40, 70),
            journey("riding", -2, 20),
            journey("soon", 5, 30),
        ]);

        let list = project(&cache, now());
        let keys: Vec<&str> = list.iter().map(|j| j.key().as_str()).collect();
        assert_eq!(keys, vec!["riding", "soon", "late"]);

        let texts: Vec<&str> = list.iter().map(|j| j.display_time_text()).collect();
        assert_eq!(texts, vec!["Departed", "5 min", "40 min"]);
    }

    #[test]
    fn project_breaks_ties_by_key() {
        let cache = JourneyCache::from_journeys([journey("b", 5, 30), journey("a", 5, 25)]);

        let list = project(&cache, now());
        assert_eq!(list[0].key().as_str(), "a");
        assert_eq!(list[1].key().as_str(), "b");
    }

    #[test]
    fn project_does_not_touch_cache() {
        let cache = JourneyCache::from_journeys([journey("soon", 5, 30)]);
        let _ = project(&cache, now());

        assert_eq!(cache.journeys().next().unwrap().display_time_text(), "");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::testing::{journey, now};
    use proptest::prelude::*;

    proptest! {
        /// Property: projection is non-decreasing in departure time.
        #[test]
        fn projection_sorted(deps in prop::collection::vec(-120i64..240, 0..30)) {
            let cache = JourneyCache::from_journeys(
                deps.iter()
                    .enumerate()
                    .map(|(i, d)| journey(&format!("J{i}"), *d, d + 30)),
            );

            let list = project(&cache, now());
            prop_assert_eq!(list.len(), cache.len());
            for pair in list.windows(2) {
                prop_assert!(pair[0].origin_time() <= pair[1].origin_time());
            }
        }

        /// Property: started journeys are labelled departed, upcoming ones are not.
        #[test]
        fn departed_label_matches_has_started(dep in -600i64..600) {
            let base = now();
            let departure = base + chrono::Duration::seconds(dep);
            let text = display_time_text(departure, base);
            prop_assert_eq!(text == DEPARTED_TEXT, departure <= base);
        }
    }
}
