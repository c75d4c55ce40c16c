//! Refresh coordinator configuration.

use std::time::Duration;

use crate::reconcile::RetentionPolicy;

/// Timing and retention parameters for a refresh session.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// At most one fetch trigger per window.
    pub rate_limit_window: Duration,

    /// How often display texts are recomputed.
    pub display_tick: Duration,

    /// How often live data is refetched without user action.
    pub auto_refresh_interval: Duration,

    /// How long a loop survives with no observers.
    /// Covers brief unsubscribe/resubscribe cycles such as screen rotation.
    pub observer_grace: Duration,

    /// Deadline for a single fetch.
    pub fetch_timeout: Duration,

    /// Which started journeys survive a refresh.
    pub retention: RetentionPolicy,
}

impl RefreshConfig {
    /// Set the rate limit window.
    pub fn with_rate_limit_window(mut self, window: Duration) -> Self {
        self.rate_limit_window = window;
        self
    }

    /// Set the display tick interval.
    pub fn with_display_tick(mut self, tick: Duration) -> Self {
        self.display_tick = tick;
        self
    }

    /// Set the auto-refresh interval.
    pub fn with_auto_refresh_interval(mut self, interval: Duration) -> Self {
        self.auto_refresh_interval = interval;
        self
    }

    /// Set the observer grace period.
    pub fn with_observer_grace(mut self, grace: Duration) -> Self {
        self.observer_grace = grace;
        self
    }

    /// Set the fetch deadline.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the retention policy.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            rate_limit_window: Duration::from_secs(1),
            display_tick: Duration::from_secs(10),
            auto_refresh_interval: Duration::from_secs(30),
            observer_grace: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(20),
            retention: RetentionPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{MAX_RETAINED_STARTED, STARTED_RETENTION_THRESHOLD};

    #[test]
    fn default_config() {
        let config = RefreshConfig::default();

        assert_eq!(config.rate_limit_window, Duration::from_secs(1));
        assert_eq!(config.display_tick, Duration::from_secs(10));
        assert_eq!(config.auto_refresh_interval, Duration::from_secs(30));
        assert_eq!(config.observer_grace, Duration::from_secs(5));
        assert_eq!(config.fetch_timeout, Duration::from_secs(20));
        assert_eq!(
            config.retention.started_retention_threshold,
            STARTED_RETENTION_THRESHOLD
        );
        assert_eq!(config.retention.max_retained_started, MAX_RETAINED_STARTED);
    }

    #[test]
    fn custom_config() {
        let config = RefreshConfig::default()
            .with_rate_limit_window(Duration::from_millis(500))
            .with_display_tick(Duration::from_secs(5))
            .with_auto_refresh_interval(Duration::from_secs(60))
            .with_observer_grace(Duration::ZERO)
            .with_fetch_timeout(Duration::from_secs(3))
            .with_retention(RetentionPolicy::new(chrono::Duration::minutes(5), 1));

        assert_eq!(config.rate_limit_window, Duration::from_millis(500));
        assert_eq!(config.display_tick, Duration::from_secs(5));
        assert_eq!(config.auto_refresh_interval, Duration::from_secs(60));
        assert_eq!(config.observer_grace, Duration::ZERO);
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.retention.max_retained_started, 1);
    }
}
