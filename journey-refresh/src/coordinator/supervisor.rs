//! Observer-counted background loops.
//!
//! A loop runs while at least one [`LoopGuard`] is alive. When the last
//! guard drops, the loop keeps running for a grace period so a quick
//! unsubscribe/resubscribe does not restart it; after that it is aborted.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

type LoopFactory = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Starts and stops one background loop according to observer count.
#[derive(Clone)]
pub struct LoopSupervisor {
    shared: Arc<Shared>,
}

struct Shared {
    name: &'static str,
    grace: Duration,
    factory: LoopFactory,
    state: Mutex<SupervisorState>,
}

#[derive(Default)]
struct SupervisorState {
    observers: usize,
    task: Option<JoinHandle<()>>,
    teardown: Option<JoinHandle<()>>,
}

impl LoopSupervisor {
    /// Create a supervisor. `factory` builds a fresh loop future each time
    /// the loop (re)starts.
    pub fn new<F>(name: &'static str, grace: Duration, factory: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                name,
                grace,
                factory: Box::new(factory),
                state: Mutex::new(SupervisorState::default()),
            }),
        }
    }

    /// Register an observer, starting the loop if it is not running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn acquire(&self) -> LoopGuard {
        let mut state = self.shared.lock();
        state.observers += 1;

        if let Some(teardown) = state.teardown.take() {
            teardown.abort();
        }

        let running = state.task.as_ref().is_some_and(|t| !t.is_finished());
        if !running {
            debug!(name = self.shared.name, "Starting loop");
            state.task = Some(tokio::spawn((self.shared.factory)()));
        }

        LoopGuard {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared
            .lock()
            .task
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    pub fn observer_count(&self) -> usize {
        self.shared.lock().observers
    }

    /// Abort the loop now, regardless of observers.
    ///
    /// Live guards stay valid; the next [`acquire`](Self::acquire) restarts
    /// the loop.
    pub fn stop(&self) {
        let mut state = self.shared.lock();
        if let Some(teardown) = state.teardown.take() {
            teardown.abort();
        }
        if let Some(task) = state.task.take() {
            task.abort();
            debug!(name = self.shared.name, "Stopped loop");
        }
    }
}

impl fmt::Debug for LoopSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopSupervisor")
            .field("name", &self.shared.name)
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SupervisorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(self: &Arc<Self>) {
        let mut state = self.lock();
        state.observers = state.observers.saturating_sub(1);
        if state.observers > 0 {
            return;
        }

        match Handle::try_current() {
            Ok(handle) if !self.grace.is_zero() => {
                let shared = Arc::clone(self);
                let grace = self.grace;
                state.teardown = Some(handle.spawn(async move {
                    tokio::time::sleep(grace).await;
                    shared.teardown_if_idle();
                }));
            }
            // No runtime to wait on, or no grace: stop now.
            _ => {
                if let Some(task) = state.task.take() {
                    task.abort();
                    debug!(name = self.name, "Stopped loop");
                }
            }
        }
    }

    fn teardown_if_idle(&self) {
        let mut state = self.lock();
        // Resubscribed while the timer was firing.
        if state.observers > 0 {
            return;
        }
        state.teardown = None;
        if let Some(task) = state.task.take() {
            task.abort();
            debug!(name = self.name, "Stopped loop after grace period");
        }
    }
}

/// Keeps a supervised loop alive. Dropping it releases the observer.
pub struct LoopGuard {
    shared: Arc<Shared>,
}

impl fmt::Debug for LoopGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopGuard")
            .field("name", &self.shared.name)
            .finish()
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.shared.release();
    }
}
