//! Fixed-width terminal table of the current poll. Fire-and-forget; nothing
//! here feeds back into the decision engine.

use chrono::{DateTime, Utc};

use crate::fix::EnrichedFlight;
use crate::geo;

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}

pub fn render_table(
    flights: &[EnrichedFlight],
    home_lat: f64,
    home_lon: f64,
    range_km: f64,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let range = if range_km > 0.0 {
        format!("within {:.0} km", range_km)
    } else {
        "in the query box".to_string()
    };
    out.push_str(&format!(
        "{} aircraft {} at {}\n",
        flights.len(),
        range,
        now.format("%H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "{:<10} {:<7} {:>8} {:>7} {:>6} {:<9} {:>6} {}\n",
        "CALLSIGN", "ICAO24", "ALT m", "SPD m/s", "KM", "DIR", "ETA s", "ROUTE"
    ));

    for flight in flights {
        let fix = &flight.fix;
        let direction = geo::classify_direction(
            fix.latitude,
            fix.longitude,
            flight.effective_track_degrees(),
            fix.distance_from_home_km,
            home_lat,
            home_lon,
        )
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
        let eta = geo::eta_to_closest_approach_seconds(
            fix.latitude,
            fix.longitude,
            flight.effective_track_degrees(),
            fix.ground_speed_ms,
            home_lat,
            home_lon,
        );
        let route = flight
            .route
            .as_ref()
            .map(|r| {
                format!(
                    "{}-{}",
                    r.origin.label().unwrap_or("?"),
                    r.destination.label().unwrap_or("?")
                )
            })
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!(
            "{:<10} {:<7} {:>8} {:>7} {:>6} {:<9} {:>6} {}\n",
            fix.normalized_callsign().unwrap_or_else(|| "-".to_string()),
            fix.icao24,
            fmt_opt(fix.baro_altitude_m, 0),
            fmt_opt(fix.ground_speed_ms, 0),
            fmt_opt(fix.distance_from_home_km, 1),
            direction,
            fmt_opt(eta, 0),
            route,
        ));
    }
    out
}

pub fn print_table(
    flights: &[EnrichedFlight],
    home_lat: f64,
    home_lon: f64,
    range_km: f64,
    now: DateTime<Utc>,
) {
    println!("{}", render_table(flights, home_lat, home_lon, range_km, now));
}
