//! The poll loop: one active cycle at a time, enrichment fan-out inside it.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::adsbdb_client::AdsbDbClient;
use crate::config::Config;
use crate::display;
use crate::enricher::FlightEnricher;
use crate::facts_client::FactsClient;
use crate::feed::{AdsbFeedClient, FlightFeed};
use crate::notifier::{LogNotifier, NotificationSink, TelegramNotifier};
use crate::photos_client::PlanespottersClient;
use crate::proximity::ProximityEngine;
use crate::sightings_repo::SightingsRepository;

pub async fn handle_run(config: Config, shutdown: CancellationToken) -> Result<()> {
    info!(
        "Watching ({:.4}, {:.4}), box {:.2} deg, poll every {:?}",
        config.home_latitude,
        config.home_longitude,
        config.bounding_box_degrees,
        config.poll_interval()
    );

    let client = reqwest::Client::builder()
        .user_agent(concat!("skywatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    // Failing to open the log store is the one non-cancellation exit path.
    let store = Arc::new(SightingsRepository::open(&config.database_path).await?);

    let notifier: Arc<dyn NotificationSink> = match &config.telegram {
        Some(telegram) => Arc::new(TelegramNotifier::new(client.clone(), telegram.clone())),
        None => {
            info!("Telegram not configured; notifications go to the log");
            Arc::new(LogNotifier)
        }
    };

    let adsbdb = Arc::new(AdsbDbClient::new(client.clone()));
    let mut enricher = FlightEnricher::new(
        adsbdb.clone(),
        adsbdb,
        Arc::new(PlanespottersClient::new(client.clone())),
        Arc::new(FactsClient::new(client.clone(), config.facts.clone())),
    );
    let feed = AdsbFeedClient::new(client, &config);
    let mut engine = ProximityEngine::new(&config, notifier, store);
    let interval = config.poll_interval();

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        // The poll+enrich phase is raced against cancellation; dropping it
        // aborts the in-flight HTTP calls. The decision phase below is not:
        // once started, a cycle completes its notify+log work.
        let cycle = async {
            let fixes = feed.poll_flights().await?;
            anyhow::Ok(enricher.enrich_all(fixes).await)
        };
        let outcome = tokio::select! {
            _ = shutdown.cancelled() => break,
            outcome = cycle => outcome,
        };

        let now = Utc::now();
        match outcome {
            Ok(flights) => {
                let summary = engine.process_poll(&flights, now).await;
                display::print_table(
                    &flights,
                    config.home_latitude,
                    config.home_longitude,
                    config.visual_range_km,
                    now,
                );
                debug!(
                    "Cycle done: {} flights, {} new, {} notified",
                    flights.len(),
                    summary.new_entrants.len(),
                    summary.notified.len()
                );
            }
            Err(err) => engine.report_poll_error(&err, now).await,
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Shutting down");
    Ok(())
}
