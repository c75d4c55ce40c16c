//! The refresh coordinator.
//!
//! Owns one trip session and the three loops that keep it live:
//!
//! - the fetch loop drains rate-limited triggers and runs one fetch at a time
//! - the display ticker recomputes "5 min" style texts without fetching
//! - the auto-refresh ticker fires a trigger while live tracking makes sense
//!
//! Each loop runs only while someone observes it (see [`LoopSupervisor`]).
//! Triggers fired with nobody observing wait in the limiter and are served
//! once the fetch loop starts.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::domain::{DateTimeSelection, Journey, StopId, TransportMode, TripContext};
use crate::fetcher::{FetchError, TripFetcher};
use crate::rate_limit::RateLimiter;
use crate::reconcile::JourneyCache;
use crate::store::{SavedTrip, TripStore};

use super::config::RefreshConfig;
use super::error::CoordinatorError;
use super::session::{CommitOutcome, Session};
use super::state::{ExplicitTrigger, JourneyListState};
use super::supervisor::{LoopGuard, LoopSupervisor};

/// The background loops a coordinator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    Fetch,
    DisplayTicker,
    AutoRefresh,
}

impl LoopKind {
    pub const ALL: [LoopKind; 3] = [
        LoopKind::Fetch,
        LoopKind::DisplayTicker,
        LoopKind::AutoRefresh,
    ];
}

/// Keeps a trip's journey list fresh.
///
/// Cloning is not supported; share it behind an `Arc` if several owners
/// need it. Must be used from within a tokio runtime.
pub struct RefreshCoordinator<F: TripFetcher> {
    inner: Arc<Inner<F>>,
    fetch_loop: LoopSupervisor,
    display_ticker: LoopSupervisor,
    auto_refresh: LoopSupervisor,
}

struct Inner<F> {
    fetcher: F,
    store: Arc<dyn TripStore>,
    clock: Arc<dyn Clock>,
    config: RefreshConfig,
    limiter: RateLimiter,
    session: Mutex<Session>,
    state_tx: watch::Sender<JourneyListState>,
}

impl<F: TripFetcher> RefreshCoordinator<F> {
    pub fn new(
        fetcher: F,
        store: Arc<dyn TripStore>,
        clock: Arc<dyn Clock>,
        config: RefreshConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(JourneyListState::Idle);
        let grace = config.observer_grace;
        let inner = Arc::new(Inner {
            fetcher,
            store,
            clock,
            limiter: RateLimiter::new(config.rate_limit_window),
            config,
            session: Mutex::new(Session::new()),
            state_tx,
        });

        let fetch_inner = Arc::clone(&inner);
        let fetch_loop = LoopSupervisor::new("fetch", grace, move || {
            Arc::clone(&fetch_inner).run_fetch_loop().boxed()
        });

        let ticker_inner = Arc::clone(&inner);
        let display_ticker = LoopSupervisor::new("display_ticker", grace, move || {
            Arc::clone(&ticker_inner).run_display_ticker().boxed()
        });

        let auto_inner = Arc::clone(&inner);
        let auto_refresh = LoopSupervisor::new("auto_refresh", grace, move || {
            Arc::clone(&auto_inner).run_auto_refresh().boxed()
        });

        Self {
            inner,
            fetch_loop,
            display_ticker,
            auto_refresh,
        }
    }

    /// Load a trip, replacing whatever was loaded before.
    pub fn initialize_trip(
        &self,
        origin: StopId,
        destination: StopId,
    ) -> Result<(), CoordinatorError> {
        let context = TripContext::new(origin, destination)?;
        self.initialize_context(context);
        Ok(())
    }

    /// Load a fully specified context, replacing whatever was loaded before.
    ///
    /// Clears the cache, cancels any fetch in flight for the old context
    /// and fires a trigger that the old context's rate window cannot
    /// swallow.
    pub fn initialize_context(&self, context: TripContext) {
        self.inner.check_stops(&context);
        let trip_id = context.trip_id();
        let trip_saved = match self.inner.store.is_trip_saved(&trip_id) {
            Ok(saved) => saved,
            Err(e) => {
                warn!(trip_id = %trip_id, error = %e, "Could not check saved trips");
                false
            }
        };

        {
            let mut session = self.inner.lock_session();
            let generation = session.replace_context(context, trip_saved);
            info!(generation, trip_id = %trip_id, "Trip context replaced");
            self.inner.publish(&session);
        }

        self.inner.limiter.reset();
        self.inner.limiter.trigger();
    }

    /// Apply an explicit user action and refetch.
    pub fn on_explicit_trigger(&self, trigger: ExplicitTrigger) -> Result<(), CoordinatorError> {
        let current = self.context().ok_or(CoordinatorError::NoActiveTrip)?;

        match trigger {
            ExplicitTrigger::Reverse => {
                self.initialize_context(current.reversed());
            }
            ExplicitTrigger::DateTimeChanged(selection) => {
                self.initialize_context(current.with_date_time(selection));
            }
            ExplicitTrigger::ModeFilterChanged(modes) => {
                {
                    let mut session = self.inner.lock_session();
                    let generation = session
                        .change_excluded_modes(modes)
                        .ok_or(CoordinatorError::NoActiveTrip)?;
                    debug!(generation, "Mode filter changed");
                    self.inner.publish(&session);
                }
                self.inner.limiter.reset();
                self.inner.limiter.trigger();
            }
        }

        Ok(())
    }

    /// Swap origin and destination.
    pub fn reverse_trip(&self) -> Result<(), CoordinatorError> {
        self.on_explicit_trigger(ExplicitTrigger::Reverse)
    }

    /// Pick a date/time, or `None` to depart now.
    pub fn change_date_time(
        &self,
        selection: Option<DateTimeSelection>,
    ) -> Result<(), CoordinatorError> {
        self.on_explicit_trigger(ExplicitTrigger::DateTimeChanged(selection))
    }

    /// Replace the set of excluded transport modes.
    pub fn change_mode_filter(
        &self,
        excluded: BTreeSet<TransportMode>,
    ) -> Result<(), CoordinatorError> {
        self.on_explicit_trigger(ExplicitTrigger::ModeFilterChanged(excluded))
    }

    /// Ask for a refetch of the current context. Subject to rate limiting.
    pub fn retry(&self) -> Result<(), CoordinatorError> {
        if self.context().is_none() {
            return Err(CoordinatorError::NoActiveTrip);
        }
        if !self.inner.limiter.trigger() {
            debug!("Retry coalesced into pending refresh");
        }
        Ok(())
    }

    /// Save the current trip.
    pub fn save_trip(&self) -> Result<(), CoordinatorError> {
        let context = self.context().ok_or(CoordinatorError::NoActiveTrip)?;
        self.inner.store.save_trip(&SavedTrip::from(&context))?;

        let mut session = self.inner.lock_session();
        // The context may have been replaced while we were writing.
        if session.context() == Some(&context) {
            session.mark_trip_saved();
        }
        info!(trip_id = %context.trip_id(), "Trip saved");
        Ok(())
    }

    pub fn is_trip_saved(&self) -> bool {
        self.inner.lock_session().is_trip_saved()
    }

    /// The current query context, if a trip is loaded.
    pub fn context(&self) -> Option<TripContext> {
        self.inner.lock_session().context().cloned()
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock_session().generation()
    }

    /// Snapshot of the journey cache.
    pub fn cache_snapshot(&self) -> JourneyCache {
        self.inner.lock_session().cache()
    }

    /// The state as of the last publish.
    pub fn state(&self) -> JourneyListState {
        self.inner.state_tx.borrow().clone()
    }

    /// Observe the journey list, keeping every loop running.
    pub fn subscribe(&self) -> JourneyListSubscription {
        self.subscribe_to(&LoopKind::ALL)
    }

    /// Observe the journey list, keeping only the given loops running.
    pub fn subscribe_to(&self, loops: &[LoopKind]) -> JourneyListSubscription {
        let guards = loops
            .iter()
            .map(|kind| self.supervisor(*kind).acquire())
            .collect();

        JourneyListSubscription {
            rx: self.inner.state_tx.subscribe(),
            guards,
        }
    }

    pub fn is_loop_running(&self, kind: LoopKind) -> bool {
        self.supervisor(kind).is_running()
    }

    /// Stop every loop and cancel any fetch in flight.
    pub fn shutdown(&self) {
        for kind in LoopKind::ALL {
            self.supervisor(kind).stop();
        }
        self.inner.lock_session().abort_in_flight();
        debug!("Coordinator shut down");
    }

    fn supervisor(&self, kind: LoopKind) -> &LoopSupervisor {
        match kind {
            LoopKind::Fetch => &self.fetch_loop,
            LoopKind::DisplayTicker => &self.display_ticker,
            LoopKind::AutoRefresh => &self.auto_refresh,
        }
    }
}

impl<F: TripFetcher> Inner<F> {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push the session's current state to observers.
    ///
    /// Called with the session lock held so publishes are ordered.
    fn publish(&self, session: &Session) {
        self.state_tx
            .send_replace(session.list_state(self.clock.now()));
    }

    fn check_stops(&self, context: &TripContext) {
        for stop in [context.origin(), context.destination()] {
            match self.store.stop_exists(stop) {
                Ok(true) => {}
                Ok(false) => warn!(stop = %stop, "Stop not known locally"),
                Err(e) => warn!(stop = %stop, error = %e, "Could not look up stop"),
            }
        }
    }

    async fn run_fetch_loop(self: Arc<Self>) {
        let _rearm = RearmOnStop {
            inner: Arc::clone(&self),
        };
        while self.limiter.next().await.is_some() {
            self.fetch_once().await;
        }
    }

    async fn fetch_once(self: &Arc<Self>) {
        let deadline = self.config.fetch_timeout;

        let (generation, task) = {
            let mut session = self.lock_session();
            let Some((generation, request)) = session.begin_fetch() else {
                error!("Refresh triggered with no trip context");
                return;
            };

            let inner = Arc::clone(self);
            let task = tokio::spawn(async move {
                match tokio::time::timeout(deadline, inner.fetcher.fetch_journeys(&request)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(deadline)),
                }
            });
            session.set_in_flight(generation, task.abort_handle());
            self.publish(&session);
            (generation, task)
        };

        debug!(generation, "Fetch started");

        let result = match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                debug!(generation, "Fetch cancelled");
                return;
            }
            Err(e) => {
                error!(generation, error = %e, "Fetch task failed");
                Err(FetchError::ApiError {
                    status: 0,
                    message: "fetch task failed".to_string(),
                })
            }
        };

        self.commit(generation, result);
    }

    fn commit(&self, generation: u64, result: Result<Vec<Journey>, FetchError>) {
        let succeeded = result.is_ok();
        if let Err(e) = &result {
            warn!(generation, error = %e, "Trip fetch failed");
        }

        let alerts = {
            let mut session = self.lock_session();
            let outcome =
                session.commit_fetch(generation, result, self.clock.now(), &self.config.retention);
            if outcome == CommitOutcome::StaleResultDiscarded {
                debug!(generation, "Discarded result for replaced context");
                return;
            }

            self.publish(&session);
            let cache = session.cache();
            debug!(generation, journeys = cache.len(), "Fetch committed");

            if !succeeded {
                // A retry straight after a fast failure must not be
                // swallowed by the window of the failed attempt.
                self.limiter.reset();
                return;
            }

            cache
                .journeys()
                .map(|j| (j.key().clone(), j.alerts().cloned().collect::<Vec<_>>()))
                .collect::<Vec<_>>()
        };

        if let Err(e) = self.store.insert_alerts(&alerts) {
            warn!(generation, error = %e, "Could not store alerts");
        }
    }

    /// Called when the fetch loop stops. A fetch cut short here would never
    /// be committed, so cancel it and queue its trigger again for the next
    /// time the loop starts.
    fn rearm_interrupted_fetch(&self) {
        let interrupted = self.lock_session().abort_in_flight();
        if interrupted {
            debug!("Fetch interrupted by loop teardown, re-queued");
            self.limiter.reset();
            self.limiter.trigger();
        }
    }

    async fn run_display_ticker(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.display_tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately, so a new observer sees
        // fresh texts straight away.
        loop {
            interval.tick().await;
            self.publish(&self.lock_session());
        }
    }

    async fn run_auto_refresh(self: Arc<Self>) {
        let period = self.config.auto_refresh_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let wanted = self.lock_session().wants_auto_refresh(self.clock.now());
            if wanted {
                debug!("Auto-refresh");
                self.limiter.trigger();
            }
        }
    }
}

/// Drops with the fetch loop, whether it ends or is aborted.
struct RearmOnStop<F: TripFetcher> {
    inner: Arc<Inner<F>>,
}

impl<F: TripFetcher> Drop for RearmOnStop<F> {
    fn drop(&mut self) {
        self.inner.rearm_interrupted_fetch();
    }
}

/// A live view of the journey list.
///
/// Keeps the loops it was created with running until dropped.
pub struct JourneyListSubscription {
    rx: watch::Receiver<JourneyListState>,
    guards: Vec<LoopGuard>,
}

impl JourneyListSubscription {
    /// The latest published state.
    pub fn current(&self) -> JourneyListState {
        self.rx.borrow().clone()
    }

    /// Wait for the next publish. Returns `None` once the coordinator is gone.
    pub async fn changed(&mut self) -> Option<JourneyListState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the state satisfies `predicate`, checking the current
    /// state first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&JourneyListState) -> bool,
    ) -> Option<JourneyListState> {
        self.rx.wait_for(predicate).await.ok().map(|s| s.clone())
    }
}

impl std::fmt::Debug for JourneyListSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JourneyListSubscription")
            .field("loops", &self.guards.len())
            .finish()
    }
}
