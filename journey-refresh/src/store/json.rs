//! File-backed trip store.
//!
//! Keeps the whole store in memory and rewrites a JSON file on every
//! mutation. Adequate for a handful of saved trips and alerts.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::domain::{JourneyKey, ServiceAlert, StopId};

use super::error::StoreError;
use super::{SavedTrip, StoreData, TripStore};

/// Trip store persisted as a JSON file.
#[derive(Debug)]
pub struct JsonTripStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonTripStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// An unreadable or corrupt file is an error rather than silently
    /// discarded, so saved trips are never lost to a bad write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let data = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| StoreError::Io {
                message: format!("failed to read {}: {}", path.display(), e),
            })?;
            serde_json::from_str(&contents).map_err(|e| StoreError::Serialization {
                message: format!("failed to parse {}: {}", path.display(), e),
            })?
        } else {
            StoreData::default()
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Get the store file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record stops as known, e.g. after importing a stop list.
    pub fn insert_stops(&self, stops: impl IntoIterator<Item = StopId>) -> Result<(), StoreError> {
        self.mutate(|data| data.stops.extend(stops))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a mutation and write the result through to disk.
    ///
    /// The mutation lands in memory only once the write has succeeded.
    fn mutate(&self, f: impl FnOnce(&mut StoreData)) -> Result<(), StoreError> {
        let mut data = self.lock();
        let mut next = data.clone();
        f(&mut next);
        self.persist(&next)?;
        *data = next;
        Ok(())
    }

    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        // Create parent directories if needed
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                message: format!("failed to create store directory: {}", e),
            })?;
        }

        let json = serde_json::to_string_pretty(data).map_err(|e| StoreError::Serialization {
            message: format!("failed to serialize store: {}", e),
        })?;

        std::fs::write(&self.path, json).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to write trip store");
            StoreError::Io {
                message: format!("failed to write store file: {}", e),
            }
        })
    }
}

impl TripStore for JsonTripStore {
    fn save_trip(&self, trip: &SavedTrip) -> Result<(), StoreError> {
        self.mutate(|data| data.save_trip(trip))
    }

    fn is_trip_saved(&self, trip_id: &str) -> Result<bool, StoreError> {
        Ok(self.lock().saved_trips.contains_key(trip_id))
    }

    fn insert_alerts(
        &self,
        alerts: &[(JourneyKey, Vec<ServiceAlert>)],
    ) -> Result<(), StoreError> {
        self.mutate(|data| data.insert_alerts(alerts))
    }

    fn alerts(&self, journey: &JourneyKey) -> Result<Vec<ServiceAlert>, StoreError> {
        Ok(self.lock().alerts(journey))
    }

    fn stop_exists(&self, stop: &StopId) -> Result<bool, StoreError> {
        Ok(self.lock().stops.contains(stop))
    }
}
