//! Trip planner HTTP client.
//!
//! Provides async methods for querying the trip planning API.
//! Handles authentication, request concurrency, and conversion to domain types.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{Journey, JourneyDirection};

use super::convert::convert_trip_response;
use super::error::FetchError;
use super::types::TripResponse;
use super::{TripFetcher, TripRequest};

/// Default base URL for the trip planner API.
const DEFAULT_BASE_URL: &str = "https://api.transport.nsw.gov.au/v1/tp";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Default number of journeys to ask for.
const DEFAULT_NUM_TRIPS: u8 = 6;

/// Configuration for the trip planner client.
#[derive(Debug, Clone)]
pub struct TripPlannerConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL for the API (defaults to production)
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of journeys requested per query
    pub num_trips: u8,
}

impl TripPlannerConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 15,
            num_trips: DEFAULT_NUM_TRIPS,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set how many journeys each query asks for.
    pub fn with_num_trips(mut self, n: u8) -> Self {
        self.num_trips = n;
        self
    }
}

/// Trip planner API client.
///
/// Uses a semaphore to limit concurrent requests and avoid rate limiting.
#[derive(Debug, Clone)]
pub struct TripPlannerClient {
    http: reqwest::Client,
    base_url: String,
    num_trips: u8,
    semaphore: Arc<Semaphore>,
}

impl TripPlannerClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TripPlannerConfig) -> Result<Self, FetchError> {
        if config.api_key.is_empty() {
            return Err(FetchError::NotConfigured("trip planner API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("apikey {}", config.api_key)).map_err(|_| {
            FetchError::ApiError {
                status: 0,
                message: "Invalid API key format".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            num_trips: config.num_trips,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// Query the trip endpoint and return the raw response.
    pub async fn get_trip_raw(&self, request: &TripRequest) -> Result<TripResponse, FetchError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::ApiError {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let url = format!("{}/trip", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&query_params(request, self.num_trips))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| FetchError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }
}

impl TripFetcher for TripPlannerClient {
    async fn fetch_journeys(&self, request: &TripRequest) -> Result<Vec<Journey>, FetchError> {
        let response = self.get_trip_raw(request).await?;
        let journeys = convert_trip_response(&response);

        debug!(
            origin = %request.origin,
            destination = %request.destination,
            journeys = journeys.len(),
            "Fetched trip"
        );

        Ok(journeys)
    }
}

/// Build the query string for a trip request.
fn query_params(request: &TripRequest, num_trips: u8) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = [
        ("outputFormat", "rapidJSON"),
        ("coordOutputFormat", "EPSG:4326"),
        ("type_origin", "any"),
        ("type_destination", "any"),
        ("TfNSWTR", "true"),
        ("version", "10.2.1.42"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    params.push(("name_origin".into(), request.origin.to_string()));
    params.push(("name_destination".into(), request.destination.to_string()));
    params.push(("calcNumberOfTrips".into(), num_trips.to_string()));

    let macro_value = match request.direction {
        JourneyDirection::DepartAfter => "dep",
        JourneyDirection::ArriveBy => "arr",
    };
    params.push(("depArrMacro".into(), macro_value.into()));

    if let Some(date) = request.date {
        params.push(("itdDate".into(), date.format("%Y%m%d").to_string()));
    }
    if let Some(time) = request.time {
        params.push(("itdTime".into(), time.format("%H%M").to_string()));
    }

    if !request.excluded_modes.is_empty() {
        params.push(("excludedMeans".into(), "checkbox".into()));
        for mode in &request.excluded_modes {
            params.push((format!("exclMOT_{}", mode.code()), "1".into()));
        }
    }

    params
}
