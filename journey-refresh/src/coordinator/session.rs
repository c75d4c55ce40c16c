//! Single-writer session state.
//!
//! Every mutation of a trip session goes through [`Session`], and the
//! coordinator holds it behind one lock. A fetch is tagged with the
//! generation it was started under; committing a result from an older
//! generation is a no-op, so a slow response for a replaced context can
//! never overwrite the journeys of the current one.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;

use crate::domain::{Journey, TransportMode, TripContext};
use crate::fetcher::{FetchError, TripRequest};
use crate::projector::project;
use crate::reconcile::{JourneyCache, RetentionPolicy};

use super::state::{JourneyListState, SessionPhase};

/// What happened to a fetch result handed to [`Session::commit_fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    StaleResultDiscarded,
}

struct InFlight {
    generation: u64,
    abort: AbortHandle,
}

/// The mutable state of one trip session.
#[derive(Default)]
pub struct Session {
    context: Option<TripContext>,
    generation: u64,
    phase: SessionPhase,
    cache: JourneyCache,
    in_flight: Option<InFlight>,
    trip_saved: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> Option<&TripContext> {
        self.context.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Snapshot of the current cache.
    pub fn cache(&self) -> JourneyCache {
        self.cache.clone()
    }

    pub fn is_trip_saved(&self) -> bool {
        self.trip_saved
    }

    pub fn mark_trip_saved(&mut self) {
        self.trip_saved = true;
    }

    /// Install a new query context.
    ///
    /// Clears the cache, starts a new generation and cancels any fetch
    /// still running for the old context. Returns the new generation.
    pub fn replace_context(&mut self, context: TripContext, trip_saved: bool) -> u64 {
        self.cancel_in_flight();
        self.context = Some(context);
        self.trip_saved = trip_saved;
        self.cache = JourneyCache::empty();
        self.phase = SessionPhase::Loading;
        self.generation += 1;
        self.generation
    }

    /// Change the excluded modes of the current context.
    ///
    /// Unlike [`replace_context`](Self::replace_context) the cache is kept,
    /// so journeys already underway remain eligible for retention. Returns
    /// the new generation, or `None` with no context loaded.
    pub fn change_excluded_modes(&mut self, modes: BTreeSet<TransportMode>) -> Option<u64> {
        let context = self.context.take()?;
        self.cancel_in_flight();
        self.context = Some(context.with_excluded_modes(modes));
        self.phase = SessionPhase::Loading;
        self.generation += 1;
        Some(self.generation)
    }

    /// Snapshot what a fetch needs, and mark the session loading.
    pub fn begin_fetch(&mut self) -> Option<(u64, TripRequest)> {
        let request = TripRequest::from(self.context.as_ref()?);
        self.phase = SessionPhase::Loading;
        Some((self.generation, request))
    }

    /// Remember the running fetch so a context change can cancel it.
    pub fn set_in_flight(&mut self, generation: u64, abort: AbortHandle) {
        if generation != self.generation {
            abort.abort();
            return;
        }
        self.cancel_in_flight();
        self.in_flight = Some(InFlight { generation, abort });
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.abort.abort();
        }
    }

    /// Cancel any running fetch. Returns true if one was running.
    pub fn abort_in_flight(&mut self) -> bool {
        let running = self.in_flight.is_some();
        self.cancel_in_flight();
        running
    }

    /// Apply a fetch result tagged with `generation`.
    ///
    /// On success the cache is reconciled with the fresh journeys; on
    /// failure the cache is untouched and the phase records why.
    pub fn commit_fetch(
        &mut self,
        generation: u64,
        result: Result<Vec<Journey>, FetchError>,
        now: DateTime<Utc>,
        retention: &RetentionPolicy,
    ) -> CommitOutcome {
        if generation != self.generation {
            return CommitOutcome::StaleResultDiscarded;
        }

        if self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            self.in_flight = None;
        }

        match result {
            Ok(fresh) => {
                self.cache = retention.apply(&self.cache, fresh, now);
                self.phase = SessionPhase::Ready;
            }
            Err(e) => {
                self.phase = SessionPhase::Failed { reason: e.reason() };
            }
        }

        CommitOutcome::Applied
    }

    /// Whether the auto-refresh ticker should fire a trigger.
    ///
    /// Live tracking needs a loaded context that is not a future query,
    /// and something worth refreshing: journeys on screen, or a failure
    /// to recover from.
    pub fn wants_auto_refresh(&self, now: DateTime<Utc>) -> bool {
        let Some(context) = &self.context else {
            return false;
        };
        if context.is_future_query(now) {
            return false;
        }
        !self.cache.is_empty() || matches!(self.phase, SessionPhase::Failed { .. })
    }

    /// The state observers see, with display texts computed for `now`.
    pub fn list_state(&self, now: DateTime<Utc>) -> JourneyListState {
        let journeys = project(&self.cache, now);
        match &self.phase {
            SessionPhase::Idle => JourneyListState::Idle,
            SessionPhase::Failed { reason } => JourneyListState::Failed {
                reason: reason.clone(),
                journeys,
            },
            _ if !journeys.is_empty() => JourneyListState::Ready(journeys),
            SessionPhase::Loading => JourneyListState::Loading,
            SessionPhase::Ready => JourneyListState::NoJourneys,
        }
    }
}
