use std::path::PathBuf;
use std::sync::Arc;

use journey_refresh::clock::SystemClock;
use journey_refresh::coordinator::{JourneyListState, RefreshConfig, RefreshCoordinator};
use journey_refresh::domain::StopId;
use journey_refresh::fetcher::{
    CachedTripFetcher, FetchCacheConfig, TripPlannerClient, TripPlannerConfig,
};
use journey_refresh::store::{JsonTripStore, MemoryTripStore, TripStore};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Central to Parramatta, used when no stops are given.
const DEFAULT_ORIGIN: &str = "200060";
const DEFAULT_DESTINATION: &str = "214710";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Exiting");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = require_api_key(std::env::var("TRIP_PLANNER_API_KEY").ok())?;

    let mut planner_config = TripPlannerConfig::new(api_key);
    if let Ok(url) = std::env::var("TRIP_PLANNER_BASE_URL") {
        planner_config = planner_config.with_base_url(url);
    }
    let client = TripPlannerClient::new(planner_config)?;
    let fetcher = CachedTripFetcher::new(client, &FetchCacheConfig::default());

    let store: Arc<dyn TripStore> = match std::env::var("TRIP_STORE_PATH") {
        Ok(path) => {
            let store = JsonTripStore::open(PathBuf::from(path))?;
            info!(path = %store.path().display(), "Using file store");
            Arc::new(store)
        }
        Err(_) => Arc::new(MemoryTripStore::new()),
    };

    let origin = StopId::parse(
        &std::env::var("TRIP_ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string()),
    )?;
    let destination = StopId::parse(
        &std::env::var("TRIP_DESTINATION").unwrap_or_else(|_| DEFAULT_DESTINATION.to_string()),
    )?;

    let coordinator = RefreshCoordinator::new(
        fetcher,
        store,
        Arc::new(SystemClock),
        RefreshConfig::default(),
    );
    coordinator.initialize_trip(origin.clone(), destination.clone())?;
    info!(%origin, %destination, saved = coordinator.is_trip_saved(), "Watching trip");

    let mut subscription = coordinator.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            state = subscription.changed() => {
                let Some(state) = state else { break };
                log_state(&state);
            }
        }
    }

    coordinator.shutdown();
    Ok(())
}

/// The trip planner rejects every request without a key, so refuse to start.
fn require_api_key(value: Option<String>) -> Result<String, String> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err("TRIP_PLANNER_API_KEY must be set to query the trip planner".to_string()),
    }
}

fn log_state(state: &JourneyListState) {
    match state {
        JourneyListState::Idle => {}
        JourneyListState::Loading => info!("Loading journeys"),
        JourneyListState::NoJourneys => info!("No journeys found"),
        JourneyListState::Ready(journeys) => {
            info!(journeys = journeys.len(), "Journeys");
            for journey in journeys {
                info!(
                    key = %journey.key(),
                    departs = %journey.display_time_text(),
                    changes = journey.change_count(),
                    "  "
                );
            }
        }
        JourneyListState::Failed { reason, journeys } => {
            warn!(reason = %reason, cached = journeys.len(), "Couldn't refresh");
        }
    }
}
