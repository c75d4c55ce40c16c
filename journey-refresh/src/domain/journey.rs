//! Journey types.
//!
//! A `Journey` represents one scheduled trip instance from origin to
//! destination, made of transport legs and walks between stops.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{DomainError, StopId, TransportMode};

/// Opaque identifier of one scheduled journey.
///
/// Stable across repeated fetches describing the same itinerary.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JourneyKey(Arc<str>);

impl JourneyKey {
    /// Create a key from its string form.
    pub fn new(key: impl AsRef<str>) -> Result<Self, DomainError> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(DomainError::EmptyKey);
        }
        Ok(JourneyKey(Arc::from(key)))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for JourneyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JourneyKey({})", self.0)
    }
}

impl fmt::Display for JourneyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A service alert attached to a transport leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAlert {
    pub heading: String,
    pub message: String,
    pub url: Option<String>,
}

/// A stop visited at one end of a leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegStop {
    pub stop_id: StopId,
    pub name: String,
    /// Timetabled time at this stop
    pub planned: DateTime<Utc>,
    /// Realtime estimate, when the backend has one
    pub estimated: Option<DateTime<Utc>>,
}

impl LegStop {
    /// Returns the best known time: realtime if available, else timetabled.
    pub fn time(&self) -> DateTime<Utc> {
        self.estimated.unwrap_or(self.planned)
    }

    /// Returns the delay against the timetable, if a realtime estimate exists.
    pub fn delay(&self) -> Option<Duration> {
        self.estimated.map(|e| e.signed_duration_since(self.planned))
    }
}

/// A leg on a public transport service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportLeg {
    pub mode: TransportMode,
    /// Line name shown to riders (e.g. "T1", "333")
    pub line: String,
    /// Where the service is heading
    pub headsign: String,
    pub origin: LegStop,
    pub destination: LegStop,
    pub alerts: Vec<ServiceAlert>,
}

/// A walk between stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkLeg {
    pub duration: Duration,
}

/// A segment of a journey: either a transport leg or a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leg {
    Transport(TransportLeg),
    Walk(WalkLeg),
}

impl Leg {
    /// Returns the transport leg if this is one.
    pub fn as_transport(&self) -> Option<&TransportLeg> {
        match self {
            Leg::Transport(leg) => Some(leg),
            Leg::Walk(_) => None,
        }
    }

    /// Returns true if this is a walk.
    pub fn is_walk(&self) -> bool {
        matches!(self, Leg::Walk(_))
    }

    /// Returns the duration of this leg.
    pub fn duration(&self) -> Duration {
        match self {
            Leg::Transport(leg) => leg
                .destination
                .time()
                .signed_duration_since(leg.origin.time()),
            Leg::Walk(walk) => walk.duration,
        }
    }
}

/// One planned trip instance.
///
/// Identity and equality are defined by the key alone: two values with the
/// same key are the same journey even if their display text differs.
///
/// # Invariants
///
/// - At least one leg
/// - `origin_time <= destination_time`
#[derive(Debug, Clone)]
pub struct Journey {
    key: JourneyKey,
    origin_time: DateTime<Utc>,
    destination_time: DateTime<Utc>,
    legs: Arc<[Leg]>,
    display_time_text: String,
}

impl Journey {
    /// Constructs a journey, validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns `Err` if there are no legs or the journey arrives before it
    /// departs.
    pub fn new(
        key: JourneyKey,
        origin_time: DateTime<Utc>,
        destination_time: DateTime<Utc>,
        legs: Vec<Leg>,
    ) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyJourney);
        }

        if destination_time < origin_time {
            return Err(DomainError::InvertedTimes {
                key: key.as_str().to_string(),
            });
        }

        Ok(Journey {
            key,
            origin_time,
            destination_time,
            legs: legs.into(),
            display_time_text: String::new(),
        })
    }

    pub fn key(&self) -> &JourneyKey {
        &self.key
    }

    /// Departure instant from the origin.
    pub fn origin_time(&self) -> DateTime<Utc> {
        self.origin_time
    }

    /// Arrival instant at the destination.
    pub fn destination_time(&self) -> DateTime<Utc> {
        self.destination_time
    }

    /// True once the departure instant is at or before `now`.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.origin_time <= now
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Returns all transport legs in order.
    pub fn transport_legs(&self) -> impl Iterator<Item = &TransportLeg> {
        self.legs.iter().filter_map(Leg::as_transport)
    }

    /// Returns the number of changes (transport legs - 1, or 0 for direct).
    pub fn change_count(&self) -> usize {
        self.transport_legs().count().saturating_sub(1)
    }

    /// Returns the total journey duration.
    pub fn total_duration(&self) -> Duration {
        self.destination_time
            .signed_duration_since(self.origin_time)
    }

    /// Returns every service alert across all legs.
    pub fn alerts(&self) -> impl Iterator<Item = &ServiceAlert> {
        self.transport_legs().flat_map(|leg| leg.alerts.iter())
    }

    /// Human-readable time until departure, as of the last projection.
    pub fn display_time_text(&self) -> &str {
        &self.display_time_text
    }

    pub fn set_display_time_text(&mut self, text: impl Into<String>) {
        self.display_time_text = text.into();
    }
}

impl PartialEq for Journey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Journey {}

impl Hash for Journey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
