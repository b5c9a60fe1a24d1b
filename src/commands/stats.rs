use anyhow::Result;
use chrono::Utc;

use crate::config::Config;
use crate::sightings_repo::SightingsRepository;
use crate::stats;

/// Print summary statistics from the sighting log.
pub async fn handle_stats(config: Config) -> Result<()> {
    let repo = SightingsRepository::open(&config.database_path).await?;
    let rows = repo.stats_rows().await?;
    let local_offset = *chrono::Local::now().offset();
    let stats = stats::compute_stats(&rows, Utc::now(), local_offset);
    print!("{}", stats::format_stats(&stats));
    Ok(())
}
