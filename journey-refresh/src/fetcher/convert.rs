//! Conversion from trip planner DTOs to domain types.
//!
//! This module handles the transformation of raw trip planner responses into
//! validated journeys. A journey with any malformed leg is dropped whole;
//! it is never partially admitted.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::{
    Journey, JourneyKey, Leg, LegStop, ServiceAlert, StopId, TransportLeg, TransportMode, WalkLeg,
};

use super::types::{InfoDto, JourneyDto, LegDto, LegStopDto, TripResponse};

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversionError {
    /// Failed to parse a stop id
    #[error("invalid stop id: {0}")]
    InvalidStopId(String),

    /// Failed to parse a timestamp
    #[error("invalid time: {0}")]
    InvalidTime(String),

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Journey failed domain validation
    #[error("invalid journey: {0}")]
    InvalidJourney(#[from] crate::domain::DomainError),
}

/// Convert a trip response to journeys, in backend order.
///
/// Journeys that fail conversion are logged and skipped rather than failing
/// the whole response.
pub fn convert_trip_response(response: &TripResponse) -> Vec<Journey> {
    let journeys = response.journeys.as_deref().unwrap_or(&[]);

    let mut results = Vec::with_capacity(journeys.len());
    for (idx, dto) in journeys.iter().enumerate() {
        match convert_journey(dto) {
            Ok(journey) => results.push(journey),
            Err(e) => {
                debug!(index = idx, error = %e, "Skipping malformed journey");
            }
        }
    }

    results
}

/// Convert a single journey.
pub fn convert_journey(dto: &JourneyDto) -> Result<Journey, ConversionError> {
    let legs_dto = dto
        .legs
        .as_deref()
        .filter(|legs| !legs.is_empty())
        .ok_or(ConversionError::MissingField("legs"))?;

    let key = journey_key(dto).ok_or(ConversionError::MissingField("journey key"))?;

    // Safe: checked non-empty above
    let first = &legs_dto[0];
    let last = &legs_dto[legs_dto.len() - 1];

    let origin_stop = first
        .origin
        .as_ref()
        .ok_or(ConversionError::MissingField("origin"))?;
    let origin_time = best_time(
        origin_stop.departure_time_estimated.as_deref(),
        origin_stop.departure_time_planned.as_deref(),
        "origin departure time",
    )?;

    let destination_stop = last
        .destination
        .as_ref()
        .ok_or(ConversionError::MissingField("destination"))?;
    let destination_time = best_time(
        destination_stop.arrival_time_estimated.as_deref(),
        destination_stop.arrival_time_planned.as_deref(),
        "destination arrival time",
    )?;

    let legs = legs_dto
        .iter()
        .map(convert_leg)
        .collect::<Result<Vec<_>, _>>()?;

    let key = JourneyKey::new(key)?;
    Ok(Journey::new(key, origin_time, destination_time, legs)?)
}

/// Derive the stable key for a journey.
///
/// Built from each ride's service id and timetabled departure, so realtime
/// changes do not alter it. Walk-only journeys fall back to their endpoints.
pub fn journey_key(dto: &JourneyDto) -> Option<String> {
    let legs = dto.legs.as_deref()?;

    let rides: Vec<String> = legs
        .iter()
        .filter(|leg| !leg_mode(leg).is_walk())
        .filter_map(|leg| {
            let id = leg.transportation.as_ref()?.id.as_deref()?;
            let planned = leg.origin.as_ref()?.departure_time_planned.as_deref()?;
            Some(format!("{id}@{planned}"))
        })
        .collect();

    if !rides.is_empty() {
        return Some(rides.join("|"));
    }

    let first = legs.first()?.origin.as_ref()?;
    let last = legs.last()?.destination.as_ref()?;
    Some(format!(
        "walk:{}@{}->{}",
        first.id.as_deref()?,
        first.departure_time_planned.as_deref()?,
        last.id.as_deref()?
    ))
}

fn leg_mode(leg: &LegDto) -> TransportMode {
    leg.transportation
        .as_ref()
        .and_then(|t| t.product.as_ref())
        .and_then(|p| p.class)
        .map(TransportMode::from_code)
        // A leg without a service is a footpath.
        .unwrap_or(TransportMode::Walk)
}

fn convert_leg(leg: &LegDto) -> Result<Leg, ConversionError> {
    let mode = leg_mode(leg);

    if mode.is_walk() {
        let seconds = leg.duration.ok_or(ConversionError::MissingField("walk duration"))?;
        return Ok(Leg::Walk(WalkLeg {
            duration: Duration::seconds(seconds.max(0)),
        }));
    }

    let origin = leg
        .origin
        .as_ref()
        .ok_or(ConversionError::MissingField("leg origin"))?;
    let destination = leg
        .destination
        .as_ref()
        .ok_or(ConversionError::MissingField("leg destination"))?;

    let origin = convert_stop(
        origin,
        origin.departure_time_planned.as_deref(),
        origin.departure_time_estimated.as_deref(),
    )?;
    let destination = convert_stop(
        destination,
        destination.arrival_time_planned.as_deref(),
        destination.arrival_time_estimated.as_deref(),
    )?;

    // Presence checked by leg_mode returning a non-walk mode.
    let transportation = leg
        .transportation
        .as_ref()
        .ok_or(ConversionError::MissingField("transportation"))?;

    let line = transportation
        .disassembled_name
        .clone()
        .or_else(|| transportation.number.clone())
        .or_else(|| transportation.name.clone())
        .unwrap_or_default();

    let headsign = transportation
        .destination
        .as_ref()
        .and_then(|d| d.name.clone())
        .unwrap_or_default();

    let alerts = leg
        .infos
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .filter_map(convert_alert)
        .collect();

    Ok(Leg::Transport(TransportLeg {
        mode,
        line,
        headsign,
        origin,
        destination,
        alerts,
    }))
}

fn convert_stop(
    stop: &LegStopDto,
    planned: Option<&str>,
    estimated: Option<&str>,
) -> Result<LegStop, ConversionError> {
    let id = stop
        .id
        .as_deref()
        .ok_or(ConversionError::MissingField("stop id"))?;
    let stop_id = StopId::parse(id).map_err(|_| ConversionError::InvalidStopId(id.to_string()))?;

    let planned = parse_time(planned.ok_or(ConversionError::MissingField("planned time"))?)?;
    let estimated = estimated.map(parse_time).transpose()?;

    let name = stop
        .disassembled_name
        .clone()
        .or_else(|| stop.name.clone())
        .unwrap_or_else(|| id.to_string());

    Ok(LegStop {
        stop_id,
        name,
        planned,
        estimated,
    })
}

fn convert_alert(info: &InfoDto) -> Option<ServiceAlert> {
    if info.subtitle.is_none() && info.content.is_none() {
        return None;
    }

    Some(ServiceAlert {
        heading: info.subtitle.clone().unwrap_or_default(),
        message: info.content.clone().unwrap_or_default(),
        url: info.url.clone(),
    })
}

/// Prefer the realtime estimate, fall back to the timetable.
fn best_time(
    estimated: Option<&str>,
    planned: Option<&str>,
    field: &'static str,
) -> Result<DateTime<Utc>, ConversionError> {
    match (estimated, planned) {
        (Some(e), _) => parse_time(e),
        (None, Some(p)) => parse_time(p),
        (None, None) => Err(ConversionError::MissingField(field)),
    }
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, ConversionError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ConversionError::InvalidTime(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ride_json(id: &str, dep: &str, arr: &str) -> String {
        format!(
            r#"{{
                "duration": 1500,
                "origin": {{ "id": "200060", "name": "Central", "departureTimePlanned": "{dep}" }},
                "destination": {{ "id": "214710", "name": "Parramatta", "arrivalTimePlanned": "{arr}" }},
                "transportation": {{
                    "id": "{id}",
                    "disassembledName": "T1",
                    "destination": {{ "name": "Emu Plains" }},
                    "product": {{ "class": 1 }}
                }}
            }}"#
        )
    }

    fn walk_json(secs: i64) -> String {
        format!(
            r#"{{
                "duration": {secs},
                "origin": {{ "id": "214710", "departureTimePlanned": "2024-03-15T10:25:00Z" }},
                "destination": {{ "id": "214720", "arrivalTimePlanned": "2024-03-15T10:30:00Z" }},
                "transportation": {{ "product": {{ "class": 100 }} }}
            }}"#
        )
    }

    fn response(journeys: &[Vec<String>]) -> TripResponse {
        let journeys: Vec<String> = journeys
            .iter()
            .map(|legs| format!(r#"{{ "legs": [{}] }}"#, legs.join(",")))
            .collect();
        let json = format!(r#"{{ "journeys": [{}] }}"#, journeys.join(","));
        serde_json::from_str(&json).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
    }

    #[test]
    fn convert_direct_journey() {
        let resp = response(&[vec![ride_json(
            "T1-run-1",
            "2024-03-15T10:00:00Z",
            "2024-03-15T10:25:00Z",
        )]]);

        let journeys = convert_trip_response(&resp);
        assert_eq!(journeys.len(), 1);

        let journey = &journeys[0];
        assert_eq!(journey.key().as_str(), "T1-run-1@2024-03-15T10:00:00Z");
        assert_eq!(journey.origin_time(), at(10, 0));
        assert_eq!(journey.destination_time(), at(10, 25));

        let leg = journey.legs()[0].as_transport().unwrap();
        assert_eq!(leg.mode, TransportMode::Train);
        assert_eq!(leg.line, "T1");
        assert_eq!(leg.headsign, "Emu Plains");
    }

    #[test]
    fn estimated_times_preferred_but_key_uses_planned() {
        let json = r#"{ "journeys": [{ "legs": [{
            "origin": {
                "id": "200060",
                "departureTimePlanned": "2024-03-15T10:00:00Z",
                "departureTimeEstimated": "2024-03-15T10:04:00Z"
            },
            "destination": {
                "id": "214710",
                "arrivalTimePlanned": "2024-03-15T10:25:00Z",
                "arrivalTimeEstimated": "2024-03-15T10:29:00Z"
            },
            "transportation": { "id": "run", "product": { "class": 1 } }
        }] }] }"#;
        let resp: TripResponse = serde_json::from_str(json).unwrap();

        let journeys = convert_trip_response(&resp);
        assert_eq!(journeys[0].origin_time(), at(10, 4));
        assert_eq!(journeys[0].destination_time(), at(10, 29));
        assert_eq!(journeys[0].key().as_str(), "run@2024-03-15T10:00:00Z");
    }

    #[test]
    fn walk_legs_become_walks_and_are_not_keyed() {
        let resp = response(&[vec![
            ride_json("run", "2024-03-15T10:00:00Z", "2024-03-15T10:25:00Z"),
            walk_json(300),
        ]]);

        let journeys = convert_trip_response(&resp);
        let journey = &journeys[0];
        assert_eq!(journey.legs().len(), 2);
        assert!(journey.legs()[1].is_walk());
        assert_eq!(journey.legs()[1].duration(), Duration::minutes(5));
        assert_eq!(journey.key().as_str(), "run@2024-03-15T10:00:00Z");
        assert_eq!(journey.destination_time(), at(10, 30));
    }

    #[test]
    fn walk_only_journey_keyed_by_endpoints() {
        let resp = response(&[vec![walk_json(300)]]);

        let journeys = convert_trip_response(&resp);
        assert_eq!(
            journeys[0].key().as_str(),
            "walk:214710@2024-03-15T10:25:00Z->214720"
        );
    }

    #[test]
    fn malformed_journeys_dropped_whole() {
        let missing_times = r#"{
            "origin": { "id": "200060" },
            "destination": { "id": "214710" },
            "transportation": { "id": "bad", "product": { "class": 1 } }
        }"#
        .to_string();

        let resp = response(&[
            vec![ride_json("good", "2024-03-15T10:00:00Z", "2024-03-15T10:25:00Z")],
            vec![
                ride_json("ok-leg", "2024-03-15T10:05:00Z", "2024-03-15T10:30:00Z"),
                missing_times,
            ],
            vec![],
        ]);

        let journeys = convert_trip_response(&resp);
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].key().as_str(), "good@2024-03-15T10:00:00Z");
    }

    #[test]
    fn inverted_times_rejected() {
        let resp = response(&[vec![ride_json(
            "run",
            "2024-03-15T10:30:00Z",
            "2024-03-15T10:00:00Z",
        )]]);

        assert!(convert_trip_response(&resp).is_empty());
    }

    #[test]
    fn invalid_timestamp_rejected() {
        let resp = response(&[vec![ride_json("run", "10:00", "2024-03-15T10:25:00Z")]]);
        assert!(convert_trip_response(&resp).is_empty());
    }

    #[test]
    fn alerts_attached_to_leg() {
        let json = r#"{ "journeys": [{ "legs": [{
            "origin": { "id": "200060", "departureTimePlanned": "2024-03-15T10:00:00Z" },
            "destination": { "id": "214710", "arrivalTimePlanned": "2024-03-15T10:25:00Z" },
            "transportation": { "id": "run", "product": { "class": 1 } },
            "infos": [
                { "subtitle": "Lifts unavailable", "content": "Use ramp", "url": "https://example.org/a" },
                { "priority": "low" }
            ]
        }] }] }"#;
        let resp: TripResponse = serde_json::from_str(json).unwrap();

        let journeys = convert_trip_response(&resp);
        let alerts: Vec<_> = journeys[0].alerts().collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].heading, "Lifts unavailable");
        assert_eq!(alerts[0].url.as_deref(), Some("https://example.org/a"));
    }

    #[test]
    fn missing_journeys_is_empty() {
        let resp: TripResponse = serde_json::from_str("{}").unwrap();
        assert!(convert_trip_response(&resp).is_empty());
    }
}
