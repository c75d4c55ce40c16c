//! Short-window caching of trip planner responses.
//!
//! The trip planner contract says identical requests within a short window
//! are idempotent. Several triggers for the same context (a retry tapped
//! right after an auto-refresh, two sessions on the same trip) can therefore
//! share one response instead of each hitting the backend.
//!
//! The TTL must stay well below the auto-refresh interval, or live data
//! would stop moving.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::trace;

use crate::domain::Journey;

use super::error::FetchError;
use super::{TripFetcher, TripRequest};

/// Cached response entry.
type TripEntry = Arc<Vec<Journey>>;

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct FetchCacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for FetchCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10),
            max_capacity: 64,
        }
    }
}

/// Trip fetcher with response caching.
///
/// Wraps another fetcher and caches successful responses keyed by the full
/// request. Failures are never cached.
pub struct CachedTripFetcher<F> {
    inner: F,
    cache: MokaCache<TripRequest, TripEntry>,
}

impl<F: TripFetcher> CachedTripFetcher<F> {
    /// Create a new cached fetcher.
    pub fn new(inner: F, config: &FetchCacheConfig) -> Self {
        let cache = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { inner, cache }
    }

    /// Access the underlying fetcher for operations that bypass cache.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Get cache statistics.
    pub fn cache_entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }
}

impl<F: TripFetcher> TripFetcher for CachedTripFetcher<F> {
    async fn fetch_journeys(&self, request: &TripRequest) -> Result<Vec<Journey>, FetchError> {
        // Try cache first
        if let Some(cached) = self.cache.get(request).await {
            trace!(origin = %request.origin, "Trip cache hit");
            return Ok(cached.as_ref().clone());
        }

        let journeys = self.inner.fetch_journeys(request).await?;

        self.cache
            .insert(request.clone(), Arc::new(journeys.clone()))
            .await;

        Ok(journeys)
    }
}
