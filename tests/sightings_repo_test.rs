// Integration tests for the SQLite sighting log: the combined
// read-prior-then-insert contract and the stats row feed.

use chrono::{Duration, TimeZone, Utc};
use skywatch::fix::{EnrichedFlight, FlightFix};
use skywatch::geo::Direction;
use skywatch::sightings::{SightingRecord, SightingStore};
use skywatch::sightings_repo::SightingsRepository;
use skywatch::stats;

fn record(icao24: &str, minutes: i64) -> SightingRecord {
    let flight = EnrichedFlight {
        fix: FlightFix {
            icao24: icao24.to_string(),
            callsign: Some(format!("TST{}", minutes)),
            baro_altitude_m: Some(1200.0),
            ..Default::default()
        },
        ..Default::default()
    };
    let seen_at = Utc.with_ymd_and_hms(2026, 8, 23, 10, 0, 0).unwrap() + Duration::minutes(minutes);
    SightingRecord::from_flight(&flight, Direction::Towards, 90.0, seen_at)
}

#[tokio::test]
async fn record_sighting_returns_prior_history() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SightingsRepository::open(&dir.path().join("sightings.db"))
        .await
        .unwrap();

    // First sighting: no prior history.
    let first = repo.record_sighting(&record("484123", 0)).await.unwrap();
    assert!(first.is_none());

    // Second sighting: exactly one prior row, and the prior count must not
    // include the row being written.
    let second = repo.record_sighting(&record("484123", 10)).await.unwrap();
    let visitor = second.unwrap();
    assert_eq!(visitor.prior_sightings, 1);
    assert_eq!(
        visitor.last_seen,
        Utc.with_ymd_and_hms(2026, 8, 23, 10, 0, 0).unwrap()
    );

    let third = repo.record_sighting(&record("484123", 20)).await.unwrap();
    assert_eq!(third.unwrap().prior_sightings, 2);

    // A different aircraft has its own history.
    let other = repo.record_sighting(&record("abcdef", 30)).await.unwrap();
    assert!(other.is_none());
}

#[tokio::test]
async fn stats_rows_feed_the_aggregator() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SightingsRepository::open(&dir.path().join("sightings.db"))
        .await
        .unwrap();

    repo.record_sighting(&record("aaaaaa", 0)).await.unwrap();
    repo.record_sighting(&record("bbbbbb", 5)).await.unwrap();
    repo.record_sighting(&record("aaaaaa", 65)).await.unwrap();

    let rows = repo.stats_rows().await.unwrap();
    assert_eq!(rows.len(), 3);
    // Oldest first.
    assert!(rows[0].seen_at < rows[2].seen_at);

    let now = Utc.with_ymd_and_hms(2026, 8, 23, 11, 30, 0).unwrap();
    let computed = stats::compute_stats(&rows, now, chrono::FixedOffset::east_opt(0).unwrap());
    assert_eq!(computed.total_sightings, 3);
    assert_eq!(computed.today_unique_aircraft, 2);
    // Sightings at 10:00, 10:05, 11:05 with now 11:30: both buckets
    // occupied, streak of 2.
    assert_eq!(computed.current_streak_hours, 2);
}

#[tokio::test]
async fn reopening_preserves_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sightings.db");

    {
        let repo = SightingsRepository::open(&path).await.unwrap();
        repo.record_sighting(&record("484123", 0)).await.unwrap();
    }

    let repo = SightingsRepository::open(&path).await.unwrap();
    let visitor = repo
        .record_sighting(&record("484123", 60))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(visitor.prior_sightings, 1);
}
