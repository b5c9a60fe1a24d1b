//! Skywatch - home aircraft spotter and proximity notifier.
//!
//! Polls a live ADS-B aggregator for aircraft around a fixed home
//! coordinate, enriches each flight with route/aircraft/photo/fact metadata,
//! and fires a deduplicated Telegram notification when a flight's closest
//! approach is imminent, while keeping a SQLite sighting log.

pub mod adsbdb_client;
pub mod commands;
pub mod config;
pub mod display;
pub mod enricher;
pub mod enrichment_cache;
pub mod facts_client;
pub mod feed;
pub mod fix;
pub mod geo;
pub mod logging;
pub mod notifier;
pub mod photos_client;
pub mod proximity;
pub mod sightings;
pub mod sightings_repo;
pub mod stats;

pub use config::Config;
pub use enrichment_cache::EnrichmentCache;
pub use fix::{EnrichedFlight, FlightFix};
pub use geo::Direction;
pub use proximity::ProximityEngine;
