//! Fans a poll's raw fixes out to concurrent per-flight metadata lookups.
//!
//! Every lookup is keyed through an [`EnrichmentCache`], so across polls each
//! route/aircraft/photo/fact is fetched at most once and concurrent requests
//! for one key coalesce. A slow or failing upstream degrades that one field
//! to `None`; it never blocks or fails the rest of the batch.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::join_all;

use crate::enrichment_cache::EnrichmentCache;
use crate::fix::{AircraftInfo, EnrichedFlight, FlightFix, Route};
use crate::geo;

#[async_trait]
pub trait RouteLookup: Send + Sync {
    /// Scheduled route for a trimmed callsign. `Ok(None)` means the callsign
    /// is unknown upstream.
    async fn lookup_route(&self, callsign: &str) -> Result<Option<Route>>;
}

#[async_trait]
pub trait AircraftLookup: Send + Sync {
    async fn lookup_aircraft(&self, icao24: &str) -> Result<Option<AircraftInfo>>;
}

#[async_trait]
pub trait PhotoLookup: Send + Sync {
    /// Photo URL for an airframe; implementations fall back to the
    /// registration when the hex address yields nothing.
    async fn lookup_photo(&self, icao24: &str, registration: Option<&str>)
    -> Result<Option<String>>;
}

#[async_trait]
pub trait FactsLookup: Send + Sync {
    async fn lookup_facts(
        &self,
        type_code: Option<&str>,
        category: Option<&str>,
        registration: Option<&str>,
    ) -> Result<Option<String>>;
}

pub struct FlightEnricher {
    routes: Arc<dyn RouteLookup>,
    aircraft: Arc<dyn AircraftLookup>,
    photos: Arc<dyn PhotoLookup>,
    facts: Arc<dyn FactsLookup>,

    route_cache: EnrichmentCache<String, Route>,
    aircraft_cache: EnrichmentCache<String, AircraftInfo>,
    photo_cache: EnrichmentCache<String, String>,
    facts_cache: EnrichmentCache<String, String>,

    /// Last known position per aircraft from the previous poll, for heading
    /// inference when the transponder does not broadcast a track.
    previous_positions: HashMap<String, (f64, f64)>,
}

impl FlightEnricher {
    pub fn new(
        routes: Arc<dyn RouteLookup>,
        aircraft: Arc<dyn AircraftLookup>,
        photos: Arc<dyn PhotoLookup>,
        facts: Arc<dyn FactsLookup>,
    ) -> Self {
        Self {
            routes,
            aircraft,
            photos,
            facts,
            route_cache: EnrichmentCache::new("route"),
            aircraft_cache: EnrichmentCache::new("aircraft"),
            photo_cache: EnrichmentCache::new("photo"),
            facts_cache: EnrichmentCache::new("facts"),
            previous_positions: HashMap::new(),
        }
    }

    /// Enrich a whole poll's fixes with per-flight concurrency.
    ///
    /// Wall-clock cost is bounded by the slowest single lookup, not the sum.
    pub async fn enrich_all(&mut self, fixes: Vec<FlightFix>) -> Vec<EnrichedFlight> {
        // Heading inference compares against the previous poll, so compute
        // it before replacing the position map.
        let inferred: Vec<Option<f64>> = fixes
            .iter()
            .map(|fix| {
                if fix.track_degrees.is_some() {
                    return None;
                }
                match (
                    fix.latitude,
                    fix.longitude,
                    self.previous_positions.get(&fix.icao24),
                ) {
                    (Some(lat), Some(lon), Some(&(prev_lat, prev_lon))) => {
                        geo::infer_heading_degrees(prev_lat, prev_lon, lat, lon)
                    }
                    _ => None,
                }
            })
            .collect();

        self.previous_positions = fixes
            .iter()
            .filter_map(|fix| match (fix.latitude, fix.longitude) {
                (Some(lat), Some(lon)) => Some((fix.icao24.clone(), (lat, lon))),
                _ => None,
            })
            .collect();

        let tasks = fixes
            .into_iter()
            .zip(inferred)
            .map(|(fix, inferred_track)| self.enrich_one(fix, inferred_track));
        join_all(tasks).await
    }

    async fn enrich_one(&self, fix: FlightFix, inferred_track: Option<f64>) -> EnrichedFlight {
        let route_fut = async {
            match fix.normalized_callsign() {
                Some(callsign) => {
                    let routes = self.routes.clone();
                    let key = callsign.clone();
                    self.route_cache
                        .get_or_fetch(callsign, move || async move {
                            routes.lookup_route(&key).await
                        })
                        .await
                }
                None => None,
            }
        };

        let metadata_fut = async {
            let icao24 = fix.icao24.clone();
            let info = {
                let aircraft = self.aircraft.clone();
                let key = icao24.clone();
                self.aircraft_cache
                    .get_or_fetch(icao24.clone(), move || async move {
                        aircraft.lookup_aircraft(&key).await
                    })
                    .await
            };

            let registration = info.as_ref().and_then(|i| i.registration.clone());
            let type_code = info.as_ref().and_then(|i| i.type_code.clone());
            let category = info.as_ref().map(|i| i.category_label().to_string());

            let photo_fut = {
                let photos = self.photos.clone();
                let key = icao24.clone();
                let registration = registration.clone();
                self.photo_cache.get_or_fetch(icao24.clone(), move || async move {
                    photos.lookup_photo(&key, registration.as_deref()).await
                })
            };

            // Facts are keyed by registration when known, else by type code,
            // so every aircraft of an unknown-registration type shares one
            // cached fact.
            let facts_key = registration.clone().or_else(|| type_code.clone());
            let facts_fut = async {
                match facts_key {
                    Some(key) => {
                        let facts = self.facts.clone();
                        let type_code = type_code.clone();
                        let category = category.clone();
                        let registration = registration.clone();
                        self.facts_cache
                            .get_or_fetch(key, move || async move {
                                facts
                                    .lookup_facts(
                                        type_code.as_deref(),
                                        category.as_deref(),
                                        registration.as_deref(),
                                    )
                                    .await
                            })
                            .await
                    }
                    None => None,
                }
            };

            let (photo_url, facts_text) = tokio::join!(photo_fut, facts_fut);
            (info, photo_url, facts_text)
        };

        let (route, (aircraft_info, photo_url, facts_text)) = tokio::join!(route_fut, metadata_fut);

        EnrichedFlight {
            fix,
            route,
            aircraft: aircraft_info,
            photo_url,
            facts: facts_text,
            inferred_track_degrees: inferred_track,
        }
    }
}
