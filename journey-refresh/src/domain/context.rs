//! Trip query context.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::{DomainError, StopId, TransportMode};

/// Whether the selected time is a departure or an arrival constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JourneyDirection {
    #[default]
    DepartAfter,
    ArriveBy,
}

/// An explicit date/time chosen by the user instead of "now".
///
/// Date and time are interpreted as UTC; converting from a local picker is
/// the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTimeSelection {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub direction: JourneyDirection,
}

impl DateTimeSelection {
    pub fn new(date: NaiveDate, time: NaiveTime, direction: JourneyDirection) -> Self {
        Self {
            date,
            time,
            direction,
        }
    }

    /// The selected instant.
    pub fn instant(&self) -> DateTime<Utc> {
        self.date.and_time(self.time).and_utc()
    }
}

/// The current query parameters for one trip.
///
/// # Invariants
///
/// - Origin and destination differ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripContext {
    origin: StopId,
    destination: StopId,
    date_time: Option<DateTimeSelection>,
    excluded_modes: BTreeSet<TransportMode>,
}

impl TripContext {
    /// Create a context departing now with no mode filter.
    pub fn new(origin: StopId, destination: StopId) -> Result<Self, DomainError> {
        if origin == destination {
            return Err(DomainError::InvalidContext(
                "origin and destination are the same stop",
            ));
        }

        Ok(Self {
            origin,
            destination,
            date_time: None,
            excluded_modes: BTreeSet::new(),
        })
    }

    /// Set or clear the explicit date/time.
    pub fn with_date_time(mut self, date_time: Option<DateTimeSelection>) -> Self {
        self.date_time = date_time;
        self
    }

    /// Replace the set of excluded modes.
    pub fn with_excluded_modes(mut self, modes: BTreeSet<TransportMode>) -> Self {
        self.excluded_modes = modes;
        self
    }

    /// The same query in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            origin: self.destination.clone(),
            destination: self.origin.clone(),
            date_time: self.date_time,
            excluded_modes: self.excluded_modes.clone(),
        }
    }

    pub fn origin(&self) -> &StopId {
        &self.origin
    }

    pub fn destination(&self) -> &StopId {
        &self.destination
    }

    pub fn date_time(&self) -> Option<&DateTimeSelection> {
        self.date_time.as_ref()
    }

    pub fn excluded_modes(&self) -> &BTreeSet<TransportMode> {
        &self.excluded_modes
    }

    /// Stable identifier for saving this origin/destination pair.
    ///
    /// Stop ids never contain whitespace, so a space keeps distinct pairs
    /// apart.
    pub fn trip_id(&self) -> String {
        format!("{} {}", self.origin, self.destination)
    }

    /// True when the user explicitly asked for a time after `now`.
    ///
    /// Such queries are not live-tracked.
    pub fn is_future_query(&self, now: DateTime<Utc>) -> bool {
        self.date_time.is_some_and(|dt| dt.instant() > now)
    }
}
