//! adsbdb.com client for route and aircraft registry lookups.
//!
//! A missing callsign or airframe is a normal outcome (`Ok(None)`), not an
//! error; the API reports it as 404.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::enricher::{AircraftLookup, RouteLookup};
use crate::fix::{AircraftInfo, Airport, Route};

#[derive(Clone)]
pub struct AdsbDbClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CallsignResponse {
    response: CallsignPayload,
}

#[derive(Debug, Deserialize)]
struct CallsignPayload {
    flightroute: Option<RawFlightRoute>,
}

#[derive(Debug, Deserialize)]
struct RawFlightRoute {
    origin: RawAirport,
    destination: RawAirport,
}

#[derive(Debug, Deserialize)]
struct RawAirport {
    iata_code: Option<String>,
    icao_code: Option<String>,
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<RawAirport> for Airport {
    fn from(raw: RawAirport) -> Self {
        Airport {
            iata: raw.iata_code,
            icao: raw.icao_code,
            name: raw.name,
            latitude: raw.latitude,
            longitude: raw.longitude,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AircraftResponse {
    response: AircraftPayload,
}

#[derive(Debug, Deserialize)]
struct AircraftPayload {
    aircraft: Option<RawAircraftInfo>,
}

#[derive(Debug, Deserialize)]
struct RawAircraftInfo {
    #[serde(rename = "type")]
    type_name: Option<String>,
    icao_type: Option<String>,
    registration: Option<String>,
    registered_owner: Option<String>,
}

impl AdsbDbClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: "https://api.adsbdb.com".to_string(),
        }
    }

    /// GET a v0 endpoint, mapping 404 to `Ok(None)`.
    async fn get_optional<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}/v0/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .with_context(|| format!("Failed to query adsbdb {}", path))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("adsbdb has no data for {}", path);
            return Ok(None);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by adsbdb");
            return Err(anyhow!("Rate limited by adsbdb"));
        }
        if !status.is_success() {
            return Err(anyhow!("adsbdb error {} for {}", status, path));
        }

        let payload = response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse adsbdb response for {}", path))?;
        Ok(Some(payload))
    }
}

#[async_trait]
impl RouteLookup for AdsbDbClient {
    async fn lookup_route(&self, callsign: &str) -> Result<Option<Route>> {
        let payload: Option<CallsignResponse> =
            self.get_optional(&format!("callsign/{}", callsign)).await?;
        Ok(payload
            .and_then(|p| p.response.flightroute)
            .map(|route| Route::new(route.origin.into(), route.destination.into())))
    }
}

#[async_trait]
impl AircraftLookup for AdsbDbClient {
    async fn lookup_aircraft(&self, icao24: &str) -> Result<Option<AircraftInfo>> {
        let payload: Option<AircraftResponse> =
            self.get_optional(&format!("aircraft/{}", icao24)).await?;
        Ok(payload.and_then(|p| p.response.aircraft).map(|raw| {
            AircraftInfo {
                type_code: raw.icao_type,
                type_name: raw.type_name,
                registration: raw.registration,
                operator: raw.registered_owner,
            }
        }))
    }
}
