//! Live position feed client.
//!
//! Queries a readsb-style aggregator (api.adsb.lol by default) for aircraft
//! around home, keeps airborne aircraft only, normalizes units to SI, and
//! applies the optional visual-range post-filter.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::fix::FlightFix;
use crate::geo;

const FEET_TO_M: f64 = 0.3048;
const KNOTS_TO_MS: f64 = 0.514_444;
const FPM_TO_MS: f64 = 0.3048 / 60.0;
/// One degree of latitude in nautical miles.
const NM_PER_DEGREE: f64 = 60.0;

/// Source of per-poll aircraft observations.
#[async_trait]
pub trait FlightFeed: Send + Sync {
    async fn poll_flights(&self) -> Result<Vec<FlightFix>>;
}

/// readsb aggregator `/v2/lat/{lat}/lon/{lon}/dist/{nm}` response.
#[derive(Debug, Deserialize)]
struct AircraftResponse {
    #[serde(default)]
    ac: Vec<RawAircraft>,
}

#[derive(Debug, Deserialize)]
struct RawAircraft {
    hex: String,
    flight: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    /// Feet, or the literal string "ground".
    alt_baro: Option<Value>,
    /// Feet.
    alt_geom: Option<f64>,
    /// Knots.
    gs: Option<f64>,
    track: Option<f64>,
    /// Feet per minute.
    baro_rate: Option<f64>,
    squawk: Option<String>,
    emergency: Option<String>,
    /// Autopilot-selected altitude, feet.
    nav_altitude_mcp: Option<f64>,
    /// Wind speed in knots / direction in degrees.
    ws: Option<f64>,
    wd: Option<f64>,
    /// Outside air temperature, Celsius.
    oat: Option<f64>,
    #[serde(rename = "dbFlags")]
    db_flags: Option<u32>,
}

impl RawAircraft {
    fn is_on_ground(&self) -> bool {
        matches!(&self.alt_baro, Some(Value::String(s)) if s == "ground")
    }

    fn baro_altitude_m(&self) -> Option<f64> {
        match &self.alt_baro {
            Some(Value::Number(n)) => n.as_f64().map(|ft| ft * FEET_TO_M),
            _ => None,
        }
    }
}

/// HTTP client for the aggregator.
pub struct AdsbFeedClient {
    client: Client,
    base_url: String,
    home_lat: f64,
    home_lon: f64,
    radius_nm: f64,
    visual_range_km: f64,
}

impl AdsbFeedClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.feed_base_url.trim_end_matches('/').to_string(),
            home_lat: config.home_latitude,
            home_lon: config.home_longitude,
            // The API takes a point + radius; cover the configured box.
            radius_nm: (config.bounding_box_degrees * NM_PER_DEGREE).max(1.0),
            visual_range_km: config.visual_range_km,
        }
    }

    fn to_fix(&self, raw: RawAircraft) -> FlightFix {
        let distance_from_home_km = match (raw.lat, raw.lon) {
            (Some(lat), Some(lon)) => Some(geo::haversine_distance_km(
                lat,
                lon,
                self.home_lat,
                self.home_lon,
            )),
            _ => None,
        };

        let baro_altitude_m = raw.baro_altitude_m();

        FlightFix {
            icao24: raw.hex.trim().to_ascii_lowercase(),
            callsign: raw.flight,
            latitude: raw.lat,
            longitude: raw.lon,
            baro_altitude_m,
            geo_altitude_m: raw.alt_geom.map(|ft| ft * FEET_TO_M),
            ground_speed_ms: raw.gs.map(|kt| kt * KNOTS_TO_MS),
            track_degrees: raw.track,
            vertical_rate_ms: raw.baro_rate.map(|fpm| fpm * FPM_TO_MS),
            squawk: raw.squawk,
            emergency: raw.emergency.filter(|e| e != "none"),
            military: raw.db_flags.is_some_and(|flags| flags & 1 != 0),
            nav_altitude_m: raw.nav_altitude_mcp.map(|ft| ft * FEET_TO_M),
            wind_speed_kt: raw.ws,
            wind_direction_degrees: raw.wd,
            outside_air_temp_c: raw.oat,
            distance_from_home_km,
        }
    }

    fn keep(&self, fix: &FlightFix) -> bool {
        if self.visual_range_km <= 0.0 {
            return true;
        }
        // A fix without a position cannot be range-filtered; keep it.
        match fix.distance_from_home_km {
            Some(distance) => distance <= self.visual_range_km,
            None => true,
        }
    }
}

#[async_trait]
impl FlightFeed for AdsbFeedClient {
    async fn poll_flights(&self) -> Result<Vec<FlightFix>> {
        let url = format!(
            "{}/v2/lat/{}/lon/{}/dist/{:.1}",
            self.base_url, self.home_lat, self.home_lon, self.radius_nm
        );

        let response = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .context("Failed to query position feed")?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by position feed");
            return Err(anyhow!("Rate limited by position feed"));
        }
        if !status.is_success() {
            return Err(anyhow!("Position feed error {}", status));
        }

        let payload: AircraftResponse = response
            .json()
            .await
            .context("Failed to parse position feed response")?;

        let total = payload.ac.len();
        let fixes: Vec<FlightFix> = payload
            .ac
            .into_iter()
            .filter(|raw| !raw.is_on_ground())
            .map(|raw| self.to_fix(raw))
            .filter(|fix| self.keep(fix))
            .collect();

        metrics::counter!("feed.poll.success").increment(1);
        metrics::gauge!("feed.flights_in_range").set(fixes.len() as f64);
        debug!("Feed poll: {} aircraft, {} kept", total, fixes.len());
        Ok(fixes)
    }
}
