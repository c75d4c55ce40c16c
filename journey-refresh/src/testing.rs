//! Shared builders for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{Journey, JourneyKey, Leg, LegStop, StopId, TransportLeg, TransportMode};

/// A fixed reference instant: 2024-03-15 10:00 UTC.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
}

/// A single-leg train journey, with times given as minute offsets from `base`.
pub fn journey_at(key: &str, base: DateTime<Utc>, depart_mins: i64, arrive_mins: i64) -> Journey {
    let origin_time = base + Duration::minutes(depart_mins);
    let destination_time = base + Duration::minutes(arrive_mins);

    let leg = Leg::Transport(TransportLeg {
        mode: TransportMode::Train,
        line: "T1".into(),
        headsign: "Emu Plains".into(),
        origin: LegStop {
            stop_id: StopId::parse("200060").unwrap(),
            name: "Central".into(),
            planned: origin_time,
            estimated: None,
        },
        destination: LegStop {
            stop_id: StopId::parse("214710").unwrap(),
            name: "Parramatta".into(),
            planned: destination_time,
            estimated: None,
        },
        alerts: vec![],
    });

    Journey::new(
        JourneyKey::new(key).unwrap(),
        origin_time,
        destination_time,
        vec![leg],
    )
    .unwrap()
}

/// A single-leg journey relative to [`now`].
pub fn journey(key: &str, depart_mins: i64, arrive_mins: i64) -> Journey {
    journey_at(key, now(), depart_mins, arrive_mins)
}
