//! Pure geometry for relating an aircraft track to the home coordinate.
//!
//! All interfaces are in degrees; bearings are compass bearings, clockwise
//! from true north, normalized to [0, 360). No clock or network access.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Inside this radius the flight is overhead no matter where it points;
/// bearing math this close to home is numerically unstable anyway.
const OVERHEAD_RADIUS_KM: f64 = 5.0;

/// Heading within 30 degrees of the bearing to home counts as inbound.
const TOWARDS_MAX_DIFF_DEG: f64 = 30.0;

/// Heading within 30 degrees of the reciprocal counts as outbound.
const AWAY_MIN_DIFF_DEG: f64 = 150.0;

/// Two fixes closer than this are GPS jitter, not displacement.
const MIN_HEADING_DISPLACEMENT_M: f64 = 50.0;

/// How a flight is moving relative to home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Overhead,
    Towards,
    Away,
    Crossing,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Overhead => write!(f, "overhead"),
            Direction::Towards => write!(f, "towards"),
            Direction::Away => write!(f, "away"),
            Direction::Crossing => write!(f, "crossing"),
        }
    }
}

/// Great-circle distance between two coordinates in kilometers.
pub fn haversine_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Great-circle initial bearing from point 1 to point 2, normalized [0, 360).
pub fn initial_bearing_degrees(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let y = delta_lon.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Classify a flight's motion relative to home.
///
/// Within [`OVERHEAD_RADIUS_KM`] of home the answer is `Overhead` regardless
/// of heading (including an unknown heading). Beyond that, a missing position
/// or heading yields `None` rather than a guess.
pub fn classify_direction(
    latitude: Option<f64>,
    longitude: Option<f64>,
    heading_degrees: Option<f64>,
    distance_km: Option<f64>,
    home_lat: f64,
    home_lon: f64,
) -> Option<Direction> {
    if let Some(distance) = distance_km
        && distance <= OVERHEAD_RADIUS_KM
    {
        return Some(Direction::Overhead);
    }

    let (lat, lon, heading) = match (latitude, longitude, heading_degrees) {
        (Some(lat), Some(lon), Some(heading)) => (lat, lon, heading),
        _ => return None,
    };

    let bearing_to_home = initial_bearing_degrees(lat, lon, home_lat, home_lon);
    let diff = heading_difference_degrees(heading, bearing_to_home);

    if diff <= TOWARDS_MAX_DIFF_DEG {
        Some(Direction::Towards)
    } else if diff >= AWAY_MIN_DIFF_DEG {
        Some(Direction::Away)
    } else {
        Some(Direction::Crossing)
    }
}

/// Absolute angular difference between two headings, folded into [0, 180].
fn heading_difference_degrees(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 360.0;
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// Seconds until the flight reaches its closest point to home along the
/// current track, assuming constant heading and speed.
///
/// Uses a flat-earth equirectangular projection centered on the aircraft,
/// accurate to well under 0.1% at the sub-100 km ranges this runs at.
/// Returns `None` when any input is missing, speed is not positive, or the
/// closest-approach point is already behind the aircraft.
pub fn eta_to_closest_approach_seconds(
    latitude: Option<f64>,
    longitude: Option<f64>,
    heading_degrees: Option<f64>,
    speed_ms: Option<f64>,
    home_lat: f64,
    home_lon: f64,
) -> Option<f64> {
    let (lat, lon, heading, speed) = match (latitude, longitude, heading_degrees, speed_ms) {
        (Some(lat), Some(lon), Some(heading), Some(speed)) => (lat, lon, heading, speed),
        _ => return None,
    };
    if speed <= 0.0 {
        return None;
    }

    // Home relative to the aircraft, in meters east (x) and north (y).
    let x = (home_lon - lon).to_radians() * lat.to_radians().cos() * EARTH_RADIUS_M;
    let y = (home_lat - lat).to_radians() * EARTH_RADIUS_M;

    // Unit velocity vector from the compass heading.
    let heading_rad = heading.to_radians();
    let vx = heading_rad.sin();
    let vy = heading_rad.cos();

    // Along-track distance to the foot of the perpendicular from home.
    let along_track_m = x * vx + y * vy;
    if along_track_m <= 0.0 {
        // Closest approach is behind the aircraft; it has already passed.
        return None;
    }

    Some(along_track_m / speed)
}

/// Infer a heading from two successive fixes of the same aircraft.
///
/// Returns `None` when the fixes are under 50 m apart, where the bearing
/// would mostly reflect GPS jitter.
pub fn infer_heading_degrees(
    prev_lat: f64,
    prev_lon: f64,
    curr_lat: f64,
    curr_lon: f64,
) -> Option<f64> {
    let displacement_m = haversine_distance_km(prev_lat, prev_lon, curr_lat, curr_lon) * 1000.0;
    if displacement_m < MIN_HEADING_DISPLACEMENT_M {
        return None;
    }
    Some(initial_bearing_degrees(prev_lat, prev_lon, curr_lat, curr_lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME_LAT: f64 = 51.9836;
    const HOME_LON: f64 = 4.6312;

    #[test]
    fn distance_is_zero_for_identical_points() {
        assert_eq!(haversine_distance_km(HOME_LAT, HOME_LON, HOME_LAT, HOME_LON), 0.0);
        assert_eq!(haversine_distance_km(0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = haversine_distance_km(52.3105, 4.7683, HOME_LAT, HOME_LON);
        let ba = haversine_distance_km(HOME_LAT, HOME_LON, 52.3105, 4.7683);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn distance_schiphol_to_home_is_plausible() {
        // Schiphol is roughly 38 km from the home coordinate.
        let d = haversine_distance_km(52.3105, 4.7683, HOME_LAT, HOME_LON);
        assert!(d > 30.0 && d < 45.0, "got {d}");
    }

    #[test]
    fn bearing_due_north_is_zero() {
        let b = initial_bearing_degrees(51.0, 4.0, 52.0, 4.0);
        assert!(b.abs() < 1e-6, "got {b}");
    }

    #[test]
    fn bearing_due_east_is_ninety() {
        let b = initial_bearing_degrees(0.0, 0.0, 0.0, 1.0);
        assert!((b - 90.0).abs() < 1e-6, "got {b}");
    }

    #[test]
    fn overhead_wins_regardless_of_heading() {
        let d = classify_direction(Some(51.99), Some(4.64), Some(123.0), Some(1.2), HOME_LAT, HOME_LON);
        assert_eq!(d, Some(Direction::Overhead));

        // Even with no heading at all.
        let d = classify_direction(None, None, None, Some(4.9), HOME_LAT, HOME_LON);
        assert_eq!(d, Some(Direction::Overhead));
    }

    #[test]
    fn unknown_when_position_or_heading_missing() {
        assert_eq!(
            classify_direction(None, None, Some(180.0), Some(20.0), HOME_LAT, HOME_LON),
            None
        );
        assert_eq!(
            classify_direction(Some(52.5), Some(4.6), None, Some(57.0), HOME_LAT, HOME_LON),
            None
        );
        assert_eq!(classify_direction(None, None, None, None, HOME_LAT, HOME_LON), None);
    }

    #[test]
    fn due_north_of_home_heading_south_is_towards() {
        // From due north of home, the bearing to home is 180; heading 180
        // gives a diff of about zero.
        let d = classify_direction(Some(52.5), Some(HOME_LON), Some(180.0), Some(57.0), HOME_LAT, HOME_LON);
        assert_eq!(d, Some(Direction::Towards));
    }

    #[test]
    fn due_north_of_home_heading_north_is_away() {
        let d = classify_direction(Some(52.5), Some(HOME_LON), Some(0.0), Some(57.0), HOME_LAT, HOME_LON);
        assert_eq!(d, Some(Direction::Away));
    }

    #[test]
    fn perpendicular_heading_is_crossing() {
        let d = classify_direction(Some(52.5), Some(HOME_LON), Some(90.0), Some(57.0), HOME_LAT, HOME_LON);
        assert_eq!(d, Some(Direction::Crossing));
    }

    #[test]
    fn eta_requires_all_inputs() {
        assert_eq!(
            eta_to_closest_approach_seconds(None, Some(4.6), Some(180.0), Some(100.0), HOME_LAT, HOME_LON),
            None
        );
        assert_eq!(
            eta_to_closest_approach_seconds(Some(52.5), Some(4.6), None, Some(100.0), HOME_LAT, HOME_LON),
            None
        );
        assert_eq!(
            eta_to_closest_approach_seconds(Some(52.5), Some(4.6), Some(180.0), None, HOME_LAT, HOME_LON),
            None
        );
    }

    #[test]
    fn eta_requires_positive_speed() {
        assert_eq!(
            eta_to_closest_approach_seconds(Some(52.5), Some(HOME_LON), Some(180.0), Some(0.0), HOME_LAT, HOME_LON),
            None
        );
        assert_eq!(
            eta_to_closest_approach_seconds(Some(52.5), Some(HOME_LON), Some(180.0), Some(-10.0), HOME_LAT, HOME_LON),
            None
        );
    }

    #[test]
    fn eta_none_when_already_past() {
        // Due north of home, flying further north: home is behind.
        let eta = eta_to_closest_approach_seconds(
            Some(52.5),
            Some(HOME_LON),
            Some(0.0),
            Some(200.0),
            HOME_LAT,
            HOME_LON,
        );
        assert_eq!(eta, None);
    }

    #[test]
    fn eta_for_direct_approach_matches_distance_over_speed() {
        // ~57.4 km due north of home, heading straight at it at 200 m/s.
        let distance_m = haversine_distance_km(52.5, HOME_LON, HOME_LAT, HOME_LON) * 1000.0;
        let eta = eta_to_closest_approach_seconds(
            Some(52.5),
            Some(HOME_LON),
            Some(180.0),
            Some(200.0),
            HOME_LAT,
            HOME_LON,
        )
        .unwrap();
        let expected = distance_m / 200.0;
        assert!((eta - expected).abs() / expected < 0.01, "eta {eta} vs {expected}");
    }

    #[test]
    fn inferred_heading_rejects_jitter() {
        assert_eq!(infer_heading_degrees(51.9836, 4.6312, 51.98361, 4.63121), None);
    }

    #[test]
    fn inferred_heading_for_real_displacement() {
        // About 1.1 km due north.
        let h = infer_heading_degrees(51.9836, 4.6312, 51.9936, 4.6312).unwrap();
        assert!(h < 1.0 || h > 359.0, "got {h}");
    }
}
