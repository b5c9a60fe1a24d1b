//! TOML configuration for the watcher.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Floor for the poll interval; the public aggregators rate-limit well
/// before this.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactsConfig {
    pub api_key: String,
    #[serde(default = "default_facts_model")]
    pub model: String,
    #[serde(default = "default_facts_base_url")]
    pub base_url: String,
}

fn default_facts_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_facts_base_url() -> String {
    "https://api.openai.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Query center.
    pub home_latitude: f64,
    pub home_longitude: f64,

    /// Half-width of the feed query box, in degrees of latitude.
    #[serde(default = "default_bounding_box_degrees")]
    pub bounding_box_degrees: f64,

    /// Post-filter on distance from home; 0 disables it.
    #[serde(default)]
    pub visual_range_km: f64,

    /// Desired seconds between polls; clamped to [`MIN_POLL_INTERVAL_SECS`].
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Flights above this barometric altitude never notify.
    #[serde(default = "default_notify_altitude_ceiling_m")]
    pub notify_altitude_ceiling_m: f64,

    /// Minimum gap between repeated error status alerts.
    #[serde(default = "default_error_snooze_minutes")]
    pub error_snooze_minutes: i64,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_feed_base_url")]
    pub feed_base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<FactsConfig>,
}

fn default_bounding_box_degrees() -> f64 {
    0.25
}

fn default_poll_interval_seconds() -> u64 {
    15
}

fn default_notify_altitude_ceiling_m() -> f64 {
    5000.0
}

fn default_error_snooze_minutes() -> i64 {
    30
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./skywatch.db")
}

fn default_feed_base_url() -> String {
    "https://api.adsb.lol".to_string()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: Config =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Poll interval with the rate-limit floor applied.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(MIN_POLL_INTERVAL_SECS))
    }

    pub fn error_snooze(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.error_snooze_minutes.max(0))
    }
}

/// Resolve the config file path.
///
/// Priority:
/// 1. `SKYWATCH_CONFIG` env var
/// 2. `./skywatch.toml`
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("SKYWATCH_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("./skywatch.toml")
}
