//! Sighting log domain types and store contract.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fix::{EnrichedFlight, RepeatVisitorRecord};
use crate::geo::Direction;

/// One row of the append-only sighting log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightingRecord {
    pub icao24: String,
    pub callsign: Option<String>,
    pub registration: Option<String>,
    pub type_code: Option<String>,
    pub operator: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub direction: Direction,
    pub eta_seconds: f64,
    pub altitude_m: Option<f64>,
    pub distance_km: Option<f64>,
    pub seen_at: DateTime<Utc>,
}

impl SightingRecord {
    pub fn from_flight(
        flight: &EnrichedFlight,
        direction: Direction,
        eta_seconds: f64,
        seen_at: DateTime<Utc>,
    ) -> Self {
        let aircraft = flight.aircraft.as_ref();
        let route = flight.route.as_ref();
        Self {
            icao24: flight.fix.icao24.clone(),
            callsign: flight.fix.normalized_callsign(),
            registration: aircraft.and_then(|a| a.registration.clone()),
            type_code: aircraft.and_then(|a| a.type_code.clone()),
            operator: aircraft.and_then(|a| a.operator.clone()),
            origin: route.and_then(|r| r.origin.label().map(str::to_string)),
            destination: route.and_then(|r| r.destination.label().map(str::to_string)),
            direction,
            eta_seconds,
            altitude_m: flight.fix.baro_altitude_m,
            distance_km: flight.fix.distance_from_home_km,
            seen_at,
        }
    }
}

/// Append-only sighting store.
#[async_trait]
pub trait SightingStore: Send + Sync {
    /// Persist a sighting and return the aircraft's history *prior* to it,
    /// in one operation.
    ///
    /// Folding the repeat-visitor read and the insert into a single call (a
    /// transaction in the SQLite implementation) enforces the
    /// read-before-write ordering; a separate query after the insert would
    /// count the sighting it is about to announce.
    async fn record_sighting(&self, record: &SightingRecord)
    -> Result<Option<RepeatVisitorRecord>>;
}
