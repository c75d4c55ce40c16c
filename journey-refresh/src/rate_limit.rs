//! Refresh request coalescing.
//!
//! UI events, tickers and retries all call [`RateLimiter::trigger`]. The
//! limiter lets the first signal after a quiet period through immediately
//! and drops everything else until the window has elapsed, so a burst of
//! signals costs the backend one request.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tracing::trace;

/// A signal that a fetch should happen soon. Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTrigger;

/// Leading-edge rate limiter for refresh triggers.
///
/// Clones share state; only one consumer should drain the triggers at a
/// time (a second consumer waits for the first to finish).
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

struct Inner {
    window: Duration,
    last_emit: Mutex<Option<Instant>>,
    tx: mpsc::Sender<RefreshTrigger>,
    rx: tokio::sync::Mutex<mpsc::Receiver<RefreshTrigger>>,
}

impl RateLimiter {
    /// Create a limiter that emits at most one trigger per `window`.
    pub fn new(window: Duration) -> Self {
        // A single slot: a trigger that is already pending absorbs new ones.
        let (tx, rx) = mpsc::channel(1);
        Self {
            inner: Arc::new(Inner {
                window,
                last_emit: Mutex::new(None),
                tx,
                rx: tokio::sync::Mutex::new(rx),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Signal that a refresh is wanted.
    ///
    /// Returns true if this signal produced a trigger, false if it was
    /// coalesced into one already emitted in the current window.
    pub fn trigger(&self) -> bool {
        let now = Instant::now();
        let mut last = self
            .inner
            .last_emit
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(prev) = *last
            && now.duration_since(prev) < self.inner.window
        {
            trace!("refresh signal coalesced");
            return false;
        }

        *last = Some(now);
        match self.inner.tx.try_send(RefreshTrigger) {
            Ok(()) => true,
            // Not yet consumed: the pending trigger already covers this signal.
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Start a new quiet period so the next signal goes straight through.
    ///
    /// Used when the query context is replaced: a signal for a new context
    /// must never be swallowed by the window of the old one.
    pub fn reset(&self) {
        *self
            .inner
            .last_emit
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Wait for the next coalesced trigger.
    pub async fn next(&self) -> Option<RefreshTrigger> {
        self.inner.rx.lock().await.recv().await
    }

    /// The coalesced triggers as a stream.
    pub fn triggers(&self) -> impl Stream<Item = RefreshTrigger> + Send + 'static {
        futures::stream::unfold(self.clone(), |limiter| async move {
            let trigger = limiter.next().await?;
            Some((trigger, limiter))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    const WINDOW: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn first_signal_passes_immediately() {
        let limiter = RateLimiter::new(WINDOW);
        assert!(limiter.trigger());
        assert_eq!(limiter.next().await, Some(RefreshTrigger));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_window_emits_once() {
        let limiter = RateLimiter::new(WINDOW);
        let emitted = (0..20).filter(|_| limiter.trigger()).count();
        assert_eq!(emitted, 1);

        assert_eq!(limiter.next().await, Some(RefreshTrigger));
        let second = tokio::time::timeout(Duration::from_secs(5), limiter.next()).await;
        assert!(second.is_err(), "no trailing trigger expected");
    }

    #[tokio::test(start_paused = true)]
    async fn signal_after_window_passes() {
        let limiter = RateLimiter::new(WINDOW);
        assert!(limiter.trigger());
        limiter.next().await;

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(!limiter.trigger());

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(limiter.trigger());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_opens_a_new_window() {
        let limiter = RateLimiter::new(WINDOW);
        assert!(limiter.trigger());
        limiter.next().await;

        limiter.reset();
        assert!(limiter.trigger());
    }

    #[tokio::test(start_paused = true)]
    async fn pending_trigger_absorbs_signals() {
        let limiter = RateLimiter::new(WINDOW);
        assert!(limiter.trigger());
        limiter.reset();
        // Still queued, so this one coalesces into it.
        assert!(!limiter.trigger());
    }

    #[tokio::test(start_paused = true)]
    async fn triggers_stream_yields_emitted_triggers() {
        let limiter = RateLimiter::new(WINDOW);
        let mut triggers = Box::pin(limiter.triggers());

        limiter.trigger();
        assert_eq!(triggers.next().await, Some(RefreshTrigger));
    }
}
