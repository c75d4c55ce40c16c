//! Trip planner API response DTOs.
//!
//! These types map directly to the trip planner's JSON responses. They use
//! `Option` liberally because the API omits fields rather than sending null
//! values in many cases. Only the fields the refresher reads are modelled.

use serde::Deserialize;

/// Response from the trip endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
    /// Planned journeys, earliest first.
    pub journeys: Option<Vec<JourneyDto>>,

    /// API version string.
    pub version: Option<String>,
}

/// One planned journey.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyDto {
    /// Legs in travel order.
    pub legs: Option<Vec<LegDto>>,

    /// Number of interchanges.
    pub interchanges: Option<u32>,
}

/// A leg of a journey: a ride on one service, or a walk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegDto {
    /// Leg duration in seconds.
    pub duration: Option<i64>,

    /// Where the leg starts.
    pub origin: Option<LegStopDto>,

    /// Where the leg ends.
    pub destination: Option<LegStopDto>,

    /// The service used, or a footpath pseudo-service.
    pub transportation: Option<TransportationDto>,

    /// Service alerts affecting this leg.
    pub infos: Option<Vec<InfoDto>>,
}

/// One end of a leg.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegStopDto {
    /// Stop or platform id.
    pub id: Option<String>,

    /// Display name.
    pub name: Option<String>,

    /// Short name without locality.
    pub disassembled_name: Option<String>,

    /// Timetabled departure (RFC 3339).
    pub departure_time_planned: Option<String>,

    /// Realtime departure estimate (RFC 3339).
    pub departure_time_estimated: Option<String>,

    /// Timetabled arrival (RFC 3339).
    pub arrival_time_planned: Option<String>,

    /// Realtime arrival estimate (RFC 3339).
    pub arrival_time_estimated: Option<String>,
}

/// The service a leg rides on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportationDto {
    /// Service/run identifier, stable for a given timetabled trip.
    pub id: Option<String>,

    /// Full line name.
    pub name: Option<String>,

    /// Short line name (e.g., "T1").
    pub disassembled_name: Option<String>,

    /// Line number.
    pub number: Option<String>,

    /// Where the service terminates.
    pub destination: Option<TransportationDestinationDto>,

    /// Product class.
    pub product: Option<ProductDto>,
}

/// Terminus of a service.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportationDestinationDto {
    pub name: Option<String>,
}

/// Product information for a service.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDto {
    /// Product class code (1 = train, 5 = bus, 99/100 = footpath, ...).
    pub class: Option<u16>,

    /// Product name.
    pub name: Option<String>,
}

/// A service alert.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoDto {
    /// Alert id.
    pub id: Option<String>,

    /// Short heading.
    pub subtitle: Option<String>,

    /// Body text, may contain HTML.
    pub content: Option<String>,

    /// Link to more information.
    pub url: Option<String>,

    /// Priority ("normal", "high", ...).
    pub priority: Option<String>,
}
