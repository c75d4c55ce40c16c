//! Narrow persistence interface for trips, stops and service alerts.
//!
//! The refresh coordinator only needs four effects from storage, so that is
//! all [`TripStore`] exposes (plus a read-back of stored alerts). The storage engine behind it is not the
//! coordinator's concern.

mod error;
mod json;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::domain::{JourneyKey, ServiceAlert, StopId, TripContext};

pub use error::StoreError;
pub use json::JsonTripStore;

/// A saved origin/destination pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTrip {
    pub trip_id: String,
    pub origin: StopId,
    pub destination: StopId,
}

impl From<&TripContext> for SavedTrip {
    fn from(context: &TripContext) -> Self {
        Self {
            trip_id: context.trip_id(),
            origin: context.origin().clone(),
            destination: context.destination().clone(),
        }
    }
}

/// Storage consumed by the refresh coordinator.
pub trait TripStore: Send + Sync {
    /// Save (or re-save) a trip.
    fn save_trip(&self, trip: &SavedTrip) -> Result<(), StoreError>;

    /// Whether a trip with this id has been saved.
    fn is_trip_saved(&self, trip_id: &str) -> Result<bool, StoreError>;

    /// Replace every stored alert with `alerts`, in one write.
    ///
    /// Journeys not listed, or listed with no alerts, lose whatever was
    /// stored for them.
    fn insert_alerts(&self, alerts: &[(JourneyKey, Vec<ServiceAlert>)]) -> Result<(), StoreError>;

    /// Alerts previously stored for a journey.
    fn alerts(&self, journey: &JourneyKey) -> Result<Vec<ServiceAlert>, StoreError>;

    /// Whether the stop is known locally.
    fn stop_exists(&self, stop: &StopId) -> Result<bool, StoreError>;
}

/// Everything a store holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    saved_trips: BTreeMap<String, SavedTrip>,
    alerts: BTreeMap<String, Vec<ServiceAlert>>,
    stops: BTreeSet<StopId>,
}

impl StoreData {
    fn save_trip(&mut self, trip: &SavedTrip) {
        self.saved_trips.insert(trip.trip_id.clone(), trip.clone());
    }

    fn insert_alerts(&mut self, alerts: &[(JourneyKey, Vec<ServiceAlert>)]) {
        self.alerts = alerts
            .iter()
            .filter(|(_, alerts)| !alerts.is_empty())
            .map(|(key, alerts)| (key.as_str().to_string(), alerts.clone()))
            .collect();
    }

    fn alerts(&self, journey: &JourneyKey) -> Vec<ServiceAlert> {
        self.alerts
            .get(journey.as_str())
            .cloned()
            .unwrap_or_default()
    }
}

/// In-memory trip store.
#[derive(Debug, Default)]
pub struct MemoryTripStore {
    data: Mutex<StoreData>,
}

impl MemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that knows about the given stops.
    pub fn with_stops(stops: impl IntoIterator<Item = StopId>) -> Self {
        let store = Self::new();
        store.lock().stops.extend(stops);
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TripStore for MemoryTripStore {
    fn save_trip(&self, trip: &SavedTrip) -> Result<(), StoreError> {
        self.lock().save_trip(trip);
        Ok(())
    }

    fn is_trip_saved(&self, trip_id: &str) -> Result<bool, StoreError> {
        Ok(self.lock().saved_trips.contains_key(trip_id))
    }

    fn insert_alerts(
        &self,
        alerts: &[(JourneyKey, Vec<ServiceAlert>)],
    ) -> Result<(), StoreError> {
        self.lock().insert_alerts(alerts);
        Ok(())
    }

    fn alerts(&self, journey: &JourneyKey) -> Result<Vec<ServiceAlert>, StoreError> {
        Ok(self.lock().alerts(journey))
    }

    fn stop_exists(&self, stop: &StopId) -> Result<bool, StoreError> {
        Ok(self.lock().stops.contains(stop))
    }
}
