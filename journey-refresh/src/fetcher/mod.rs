//! Trip planning backend access.
//!
//! This module provides the [`TripFetcher`] seam the refresh coordinator
//! fetches through, an HTTP client for the trip planning API, a short-window
//! response cache, and an in-memory mock for tests.
//!
//! Key characteristics of the backend:
//! - Times are RFC 3339 instants in UTC, with optional realtime estimates
//! - Journeys carry no identifier of their own; we derive a stable key from
//!   the services and timetabled times of their legs
//! - Mode exclusion is expressed as per-product-class flags on the request

mod cache;
mod client;
mod convert;
mod error;
mod mock;
mod types;

use std::collections::BTreeSet;
use std::future::Future;

use chrono::{NaiveDate, NaiveTime};

use crate::domain::{Journey, JourneyDirection, StopId, TransportMode, TripContext};

pub use cache::{CachedTripFetcher, FetchCacheConfig};
pub use client::{TripPlannerClient, TripPlannerConfig};
pub use convert::{ConversionError, convert_trip_response, journey_key};
pub use error::FetchError;
pub use mock::MockTripFetcher;
pub use types::{
    InfoDto, JourneyDto, LegDto, LegStopDto, ProductDto, TransportationDto, TripResponse,
};

/// Parameters for one planning query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TripRequest {
    pub origin: StopId,
    pub destination: StopId,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub direction: JourneyDirection,
    pub excluded_modes: BTreeSet<TransportMode>,
}

impl From<&TripContext> for TripRequest {
    fn from(context: &TripContext) -> Self {
        let selection = context.date_time();
        Self {
            origin: context.origin().clone(),
            destination: context.destination().clone(),
            date: selection.map(|s| s.date),
            time: selection.map(|s| s.time),
            direction: selection.map(|s| s.direction).unwrap_or_default(),
            excluded_modes: context.excluded_modes().clone(),
        }
    }
}

/// Source of planned journeys.
///
/// Implementations must be idempotent for identical requests within a short
/// window, and must produce the same `JourneyKey` for the same itinerary on
/// every call. This abstraction allows the coordinator to be tested with mock
/// data.
pub trait TripFetcher: Send + Sync + 'static {
    /// Fetch upcoming journeys for the request, ordered as the backend
    /// returned them. Malformed journeys are already filtered out.
    fn fetch_journeys(
        &self,
        request: &TripRequest,
    ) -> impl Future<Output = Result<Vec<Journey>, FetchError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DateTimeSelection;

    fn stop(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    #[test]
    fn request_from_context_defaults_to_depart_now() {
        let context = TripContext::new(stop("200060"), stop("214710")).unwrap();
        let request = TripRequest::from(&context);

        assert_eq!(request.origin, stop("200060"));
        assert_eq!(request.date, None);
        assert_eq!(request.time, None);
        assert_eq!(request.direction, JourneyDirection::DepartAfter);
        assert!(request.excluded_modes.is_empty());
    }

    #[test]
    fn request_from_context_carries_selection_and_filter() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let time = NaiveTime::from_hms_opt(8, 30, 0).unwrap();
        let context = TripContext::new(stop("200060"), stop("214710"))
            .unwrap()
            .with_date_time(Some(DateTimeSelection::new(
                date,
                time,
                JourneyDirection::ArriveBy,
            )))
            .with_excluded_modes(BTreeSet::from([TransportMode::Bus, TransportMode::Ferry]));

        let request = TripRequest::from(&context);
        assert_eq!(request.date, Some(date));
        assert_eq!(request.time, Some(time));
        assert_eq!(request.direction, JourneyDirection::ArriveBy);
        assert_eq!(request.excluded_modes.len(), 2);
    }
}
