//! SQLite-backed sighting log.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::fix::RepeatVisitorRecord;
use crate::sightings::{SightingRecord, SightingStore};
use crate::stats::StatsRow;

#[derive(Clone)]
pub struct SightingsRepository {
    pool: SqlitePool,
}

impl SightingsRepository {
    /// Open (creating if missing) the sighting database and apply the
    /// schema. Failure here is a startup error and terminates the process.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open sighting database {:?}", path))?;

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sightings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                icao24 TEXT NOT NULL,
                callsign TEXT,
                registration TEXT,
                type_code TEXT,
                operator TEXT,
                origin TEXT,
                destination TEXT,
                direction TEXT NOT NULL,
                eta_seconds REAL NOT NULL,
                altitude_m REAL,
                distance_km REAL,
                seen_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create sightings table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sightings_icao24 ON sightings (icao24, seen_at)")
            .execute(&self.pool)
            .await
            .context("Failed to create sightings index")?;
        Ok(())
    }

    /// Every row the stats aggregation needs, oldest first.
    pub async fn stats_rows(&self) -> Result<Vec<StatsRow>> {
        let rows = sqlx::query(
            "SELECT seen_at, icao24, operator, type_code FROM sightings ORDER BY seen_at",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to read sighting rows")?;

        rows.into_iter()
            .map(|row| {
                Ok(StatsRow {
                    seen_at: row.try_get("seen_at")?,
                    icao24: row.try_get("icao24")?,
                    operator: row.try_get("operator")?,
                    type_code: row.try_get("type_code")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SightingStore for SightingsRepository {
    async fn record_sighting(
        &self,
        record: &SightingRecord,
    ) -> Result<Option<RepeatVisitorRecord>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin sighting transaction")?;

        let prior = sqlx::query(
            "SELECT COUNT(*) AS visits FROM sightings WHERE icao24 = ?",
        )
        .bind(&record.icao24)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count prior sightings")?;
        let visits: i64 = prior.try_get("visits")?;

        let visitor = if visits == 0 {
            None
        } else {
            let last = sqlx::query(
                "SELECT seen_at, origin, destination FROM sightings \
                 WHERE icao24 = ? ORDER BY seen_at DESC LIMIT 1",
            )
            .bind(&record.icao24)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to read last sighting")?;
            Some(RepeatVisitorRecord {
                prior_sightings: visits,
                last_seen: last.try_get("seen_at")?,
                last_origin: last.try_get("origin")?,
                last_destination: last.try_get("destination")?,
            })
        };

        sqlx::query(
            "INSERT INTO sightings \
             (icao24, callsign, registration, type_code, operator, origin, destination, \
              direction, eta_seconds, altitude_m, distance_km, seen_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.icao24)
        .bind(&record.callsign)
        .bind(&record.registration)
        .bind(&record.type_code)
        .bind(&record.operator)
        .bind(&record.origin)
        .bind(&record.destination)
        .bind(record.direction.to_string())
        .bind(record.eta_seconds)
        .bind(record.altitude_m)
        .bind(record.distance_km)
        .bind(record.seen_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert sighting")?;

        tx.commit()
            .await
            .context("Failed to commit sighting transaction")?;
        Ok(visitor)
    }
}
