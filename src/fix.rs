//! Domain types for one polled observation of an aircraft and its
//! enriched form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo;

/// One polled observation of an aircraft, normalized to SI units.
///
/// Built fresh every poll cycle and never mutated afterwards. Most fields are
/// optional: transponders differ in what they broadcast, and the aggregator
/// may serve a stale position as no position at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightFix {
    /// ICAO 24-bit transponder address, lowercase hex. Unique per aircraft.
    pub icao24: String,
    /// Operator-assigned callsign; may be blank or a placeholder.
    pub callsign: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Barometric altitude in meters.
    pub baro_altitude_m: Option<f64>,
    /// Geometric (GNSS) altitude in meters.
    pub geo_altitude_m: Option<f64>,
    /// Ground speed in m/s.
    pub ground_speed_ms: Option<f64>,
    /// Track over ground in degrees, when broadcast.
    pub track_degrees: Option<f64>,
    /// Vertical rate in m/s, positive climbing.
    pub vertical_rate_ms: Option<f64>,
    pub squawk: Option<String>,
    /// Emergency state as reported by the transponder ("none" is filtered
    /// out at the feed boundary).
    pub emergency: Option<String>,
    pub military: bool,
    /// Autopilot-selected altitude in meters.
    pub nav_altitude_m: Option<f64>,
    pub wind_speed_kt: Option<f64>,
    pub wind_direction_degrees: Option<f64>,
    pub outside_air_temp_c: Option<f64>,
    /// Great-circle distance from home in km, derived at the feed boundary
    /// when a position is present.
    pub distance_from_home_km: Option<f64>,
}

impl FlightFix {
    /// Callsign trimmed of padding, `None` when blank.
    pub fn normalized_callsign(&self) -> Option<String> {
        self.callsign
            .as_deref()
            .map(str::trim)
            .filter(|cs| !cs.is_empty())
            .map(str::to_string)
    }
}

/// Scheduled route endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Airport {
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Airport {
    /// Shortest display label: IATA, else ICAO, else name.
    pub fn label(&self) -> Option<&str> {
        self.iata
            .as_deref()
            .or(self.icao.as_deref())
            .or(self.name.as_deref())
    }
}

/// Scheduled route for a callsign.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Route {
    pub origin: Airport,
    pub destination: Airport,
    /// Great-circle distance between the endpoints, when both have
    /// coordinates.
    pub distance_km: Option<f64>,
}

impl Route {
    pub fn new(origin: Airport, destination: Airport) -> Self {
        let distance_km = match (
            origin.latitude,
            origin.longitude,
            destination.latitude,
            destination.longitude,
        ) {
            (Some(olat), Some(olon), Some(dlat), Some(dlon)) => {
                Some(geo::haversine_distance_km(olat, olon, dlat, dlon))
            }
            _ => None,
        };
        Self {
            origin,
            destination,
            distance_km,
        }
    }
}

/// Static registry data for an airframe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AircraftInfo {
    /// ICAO type designator, e.g. "B738".
    pub type_code: Option<String>,
    /// Human-readable type, e.g. "Boeing 737-800".
    pub type_name: Option<String>,
    pub registration: Option<String>,
    pub operator: Option<String>,
}

impl AircraftInfo {
    /// Coarse category label derived from the registry data.
    pub fn category_label(&self) -> &'static str {
        let type_name = self.type_name.as_deref().unwrap_or("").to_ascii_lowercase();
        if type_name.contains("helicopter") {
            "helicopter"
        } else if self.operator.is_some() {
            "commercial"
        } else {
            "general aviation"
        }
    }
}

/// A [`FlightFix`] plus whatever metadata the upstream lookups produced.
///
/// Created once per poll by the enricher and read-only afterwards. Any field
/// can be `None` when its upstream had no data or was unavailable.
#[derive(Debug, Clone, Default)]
pub struct EnrichedFlight {
    pub fix: FlightFix,
    pub route: Option<Route>,
    pub aircraft: Option<AircraftInfo>,
    pub photo_url: Option<String>,
    pub facts: Option<String>,
    /// Heading inferred from the previous poll's fix when the transponder
    /// did not broadcast one.
    pub inferred_track_degrees: Option<f64>,
}

impl EnrichedFlight {
    /// Broadcast heading if present, else the inferred one, else unknown.
    pub fn effective_track_degrees(&self) -> Option<f64> {
        self.fix.track_degrees.or(self.inferred_track_degrees)
    }

    pub fn registration(&self) -> Option<&str> {
        self.aircraft.as_ref().and_then(|a| a.registration.as_deref())
    }

    pub fn display_name(&self) -> String {
        self.fix
            .normalized_callsign()
            .unwrap_or_else(|| self.fix.icao24.clone())
    }
}

/// Prior sighting history for an aircraft, captured before the current
/// sighting is written to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatVisitorRecord {
    pub prior_sightings: i64,
    pub last_seen: DateTime<Utc>,
    pub last_origin: Option<String>,
    pub last_destination: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callsign_is_trimmed_and_blank_is_none() {
        let fix = FlightFix {
            callsign: Some("KLM123  ".to_string()),
            ..Default::default()
        };
        assert_eq!(fix.normalized_callsign().as_deref(), Some("KLM123"));

        let blank = FlightFix {
            callsign: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.normalized_callsign(), None);
        assert_eq!(FlightFix::default().normalized_callsign(), None);
    }

    #[test]
    fn route_distance_derived_when_coordinates_present() {
        let route = Route::new(
            Airport {
                iata: Some("AMS".into()),
                latitude: Some(52.3105),
                longitude: Some(4.7683),
                ..Default::default()
            },
            Airport {
                iata: Some("LHR".into()),
                latitude: Some(51.4700),
                longitude: Some(-0.4543),
                ..Default::default()
            },
        );
        let d = route.distance_km.unwrap();
        assert!(d > 350.0 && d < 400.0, "got {d}");
    }

    #[test]
    fn route_distance_absent_without_coordinates() {
        let route = Route::new(Airport::default(), Airport::default());
        assert_eq!(route.distance_km, None);
    }

    #[test]
    fn effective_track_prefers_broadcast() {
        let flight = EnrichedFlight {
            fix: FlightFix {
                track_degrees: Some(90.0),
                ..Default::default()
            },
            inferred_track_degrees: Some(180.0),
            ..Default::default()
        };
        assert_eq!(flight.effective_track_degrees(), Some(90.0));

        let inferred_only = EnrichedFlight {
            inferred_track_degrees: Some(180.0),
            ..Default::default()
        };
        assert_eq!(inferred_only.effective_track_degrees(), Some(180.0));
        assert_eq!(EnrichedFlight::default().effective_track_degrees(), None);
    }
}
