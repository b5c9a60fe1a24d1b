//! Per-poll notification decision engine.
//!
//! Carries the per-aircraft state across polls and decides, once per
//! approach, when to notify and log. The transition order within a poll
//! matters: new-entrant detection, then eligibility, then cleanup of
//! departed aircraft. Cleanup last is what lets an aircraft that leaves the
//! area and returns notify again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fix::EnrichedFlight;
use crate::geo::{self, Direction};
use crate::notifier::NotificationSink;
use crate::sightings::{SightingRecord, SightingStore};

/// A flight whose closest approach is within this many seconds is worth
/// stepping outside for.
pub const NOTIFY_ETA_THRESHOLD_SECS: f64 = 120.0;

/// Where a tracked aircraft is in its current approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackState {
    /// Present in the area, not yet announced.
    SeenNotNotified,
    /// Announced for this approach; stays suppressed until the aircraft
    /// leaves the result set.
    Notified,
}

#[derive(Debug, Default)]
pub struct PollSummary {
    /// Aircraft that appeared this poll (empty on the very first poll).
    pub new_entrants: Vec<String>,
    /// Aircraft announced this poll.
    pub notified: Vec<String>,
}

pub struct ProximityEngine {
    home_lat: f64,
    home_lon: f64,
    altitude_ceiling_m: f64,
    error_snooze: chrono::Duration,

    tracks: HashMap<String, TrackState>,
    /// False until one full poll has been processed; the first poll has no
    /// previous baseline, so it must produce no new-entrant events.
    baseline_established: bool,
    last_error_alert: Option<DateTime<Utc>>,

    notifier: Arc<dyn NotificationSink>,
    store: Arc<dyn SightingStore>,
}

impl ProximityEngine {
    pub fn new(
        config: &Config,
        notifier: Arc<dyn NotificationSink>,
        store: Arc<dyn SightingStore>,
    ) -> Self {
        Self {
            home_lat: config.home_latitude,
            home_lon: config.home_longitude,
            altitude_ceiling_m: config.notify_altitude_ceiling_m,
            error_snooze: config.error_snooze(),
            tracks: HashMap::new(),
            baseline_established: false,
            last_error_alert: None,
            notifier,
            store,
        }
    }

    /// Run one poll's decisions. The caller guarantees a single active poll
    /// at a time; once entered, this runs to completion so no flight is left
    /// with a half-applied notify+log pair.
    pub async fn process_poll(
        &mut self,
        flights: &[EnrichedFlight],
        now: DateTime<Utc>,
    ) -> PollSummary {
        let current: HashSet<&str> = flights.iter().map(|f| f.fix.icao24.as_str()).collect();
        let mut summary = PollSummary::default();

        // 1. New entrants, silent on the first poll.
        for flight in flights {
            let icao24 = &flight.fix.icao24;
            if !self.tracks.contains_key(icao24) {
                self.tracks
                    .insert(icao24.clone(), TrackState::SeenNotNotified);
                if self.baseline_established {
                    info!("New flight in the area: {}", flight.display_name());
                    summary.new_entrants.push(icao24.clone());
                }
            }
        }

        // 2. Notification eligibility, evaluated every poll.
        for flight in flights {
            if let Some(eta_seconds) = self.eligible_eta(flight) {
                self.announce(flight, eta_seconds, now).await;
                summary.notified.push(flight.fix.icao24.clone());
            }
        }

        // 3. Drop aircraft that left the result set, so a later re-approach
        // notifies again. Must run after eligibility, against the current
        // poll's set.
        self.tracks.retain(|icao24, _| current.contains(icao24.as_str()));

        // 4. The surviving track map is the next poll's baseline.
        self.baseline_established = true;

        metrics::gauge!("proximity.tracked_aircraft").set(self.tracks.len() as f64);
        summary
    }

    /// The ETA when `flight` should be announced right now, else `None`.
    fn eligible_eta(&self, flight: &EnrichedFlight) -> Option<f64> {
        let fix = &flight.fix;
        let eta_seconds = geo::eta_to_closest_approach_seconds(
            fix.latitude,
            fix.longitude,
            flight.effective_track_degrees(),
            fix.ground_speed_ms,
            self.home_lat,
            self.home_lon,
        )?;
        if eta_seconds > NOTIFY_ETA_THRESHOLD_SECS {
            return None;
        }
        let altitude = fix.baro_altitude_m?;
        if altitude > self.altitude_ceiling_m {
            return None;
        }
        if self.tracks.get(&fix.icao24) == Some(&TrackState::Notified) {
            return None;
        }
        Some(eta_seconds)
    }

    async fn announce(&mut self, flight: &EnrichedFlight, eta_seconds: f64, now: DateTime<Utc>) {
        let fix = &flight.fix;
        // Eligibility already implies a near approach; an unclassifiable
        // direction defaults to inbound.
        let direction = geo::classify_direction(
            fix.latitude,
            fix.longitude,
            flight.effective_track_degrees(),
            fix.distance_from_home_km,
            self.home_lat,
            self.home_lon,
        )
        .unwrap_or(Direction::Towards);

        // One store call both reads the prior history and appends the new
        // row; a store failure costs the history line and the log entry, not
        // the notification.
        let record = SightingRecord::from_flight(flight, direction, eta_seconds, now);
        let visitor = match self.store.record_sighting(&record).await {
            Ok(visitor) => visitor,
            Err(err) => {
                warn!("Failed to persist sighting for {}: {:#}", fix.icao24, err);
                None
            }
        };

        self.notifier
            .notify_flight(flight, direction, eta_seconds, visitor.as_ref())
            .await;
        metrics::counter!("proximity.notifications").increment(1);

        self.tracks
            .insert(fix.icao24.clone(), TrackState::Notified);
    }

    /// Surface a recoverable poll failure, snoozing repeats within the
    /// configured window so an extended upstream outage does not turn into
    /// an alert storm.
    pub async fn report_poll_error(&mut self, error: &anyhow::Error, now: DateTime<Utc>) {
        warn!("Poll cycle failed: {:#}", error);
        metrics::counter!("poll.errors").increment(1);

        let alert_due = match self.last_error_alert {
            None => true,
            Some(last) => now.signed_duration_since(last) >= self.error_snooze,
        };
        if alert_due {
            self.notifier
                .send_status(&format!("skywatch: poll failed: {error:#}"))
                .await;
            self.last_error_alert = Some(now);
        } else {
            debug!("Error alert snoozed");
        }
    }
}
