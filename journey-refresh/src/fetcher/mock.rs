//! Mock trip fetcher for testing without API access.
//!
//! Serves scripted responses in order, then falls back to a default list.
//! Records every request so tests can assert on what was fetched and how
//! often.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::domain::Journey;

use super::error::FetchError;
use super::{TripFetcher, TripRequest};

#[derive(Default)]
struct MockState {
    scripted: VecDeque<Result<Vec<Journey>, FetchError>>,
    default_journeys: Vec<Journey>,
    requests: Vec<TripRequest>,
    delay: Option<Duration>,
}

/// Mock trip fetcher that serves in-memory data.
///
/// Clones share state, so a test can keep a handle after moving one into
/// the coordinator.
#[derive(Clone, Default)]
pub struct MockTripFetcher {
    state: Arc<Mutex<MockState>>,
}

impl MockTripFetcher {
    /// Create a mock that returns no journeys until told otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a successful response.
    pub fn push_ok(&self, journeys: Vec<Journey>) {
        self.lock().scripted.push_back(Ok(journeys));
    }

    /// Queue a failure.
    pub fn push_err(&self, error: FetchError) {
        self.lock().scripted.push_back(Err(error));
    }

    /// Journeys returned once the scripted responses run out.
    pub fn set_default(&self, journeys: Vec<Journey>) {
        self.lock().default_journeys = journeys;
    }

    /// Make every fetch take this long.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Number of fetches started so far.
    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<TripRequest> {
        self.lock().requests.clone()
    }
}

impl TripFetcher for MockTripFetcher {
    async fn fetch_journeys(&self, request: &TripRequest) -> Result<Vec<Journey>, FetchError> {
        let (response, delay) = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            let response = match state.scripted.pop_front() {
                Some(response) => response,
                None => Ok(state.default_journeys.clone()),
            };
            (response, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        response
    }
}
