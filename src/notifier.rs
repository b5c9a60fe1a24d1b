//! Notification sinks.
//!
//! Sinks never raise: a failed send is logged and swallowed so one broken
//! delivery cannot stop the rest of the cycle.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use crate::config::TelegramConfig;
use crate::fix::{EnrichedFlight, RepeatVisitorRecord};
use crate::geo::Direction;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Announce a close approach. Must not fail.
    async fn notify_flight(
        &self,
        flight: &EnrichedFlight,
        direction: Direction,
        eta_seconds: f64,
        visitor: Option<&RepeatVisitorRecord>,
    );

    /// Out-of-band status line (startup, errors). Must not fail.
    async fn send_status(&self, text: &str);
}

/// Render the proximity message shared by every sink.
pub fn format_flight_message(
    flight: &EnrichedFlight,
    direction: Direction,
    eta_seconds: f64,
    visitor: Option<&RepeatVisitorRecord>,
) -> String {
    let mut lines = Vec::new();

    let mut headline = flight.display_name();
    if let Some(aircraft) = &flight.aircraft {
        let mut details = Vec::new();
        if let Some(reg) = &aircraft.registration {
            details.push(reg.clone());
        }
        if let Some(type_name) = &aircraft.type_name {
            details.push(type_name.clone());
        } else if let Some(type_code) = &aircraft.type_code {
            details.push(type_code.clone());
        }
        if !details.is_empty() {
            headline.push_str(&format!(" ({})", details.join(", ")));
        }
    }
    lines.push(headline);

    if let Some(operator) = flight.aircraft.as_ref().and_then(|a| a.operator.as_ref()) {
        lines.push(format!("Operated by {}", operator));
    }

    if let Some(route) = &flight.route {
        let origin = route.origin.label().unwrap_or("?");
        let destination = route.destination.label().unwrap_or("?");
        match route.distance_km {
            Some(distance) => {
                lines.push(format!("{} -> {} ({:.0} km)", origin, destination, distance))
            }
            None => lines.push(format!("{} -> {}", origin, destination)),
        }
    }

    let mut approach = format!("Heading {}, closest approach in {:.0} s", direction, eta_seconds);
    if let Some(altitude) = flight.fix.baro_altitude_m {
        approach.push_str(&format!(" at {:.0} m", altitude));
    }
    if let Some(distance) = flight.fix.distance_from_home_km {
        approach.push_str(&format!(", {:.1} km out", distance));
    }
    lines.push(approach);

    if flight.fix.military {
        lines.push("Military aircraft".to_string());
    }
    if let Some(emergency) = &flight.fix.emergency {
        lines.push(format!("EMERGENCY declared: {}", emergency));
    }

    if let Some(visitor) = visitor {
        let mut line = format!(
            "Repeat visitor: {} prior sighting(s), last {}",
            visitor.prior_sightings,
            visitor.last_seen.format("%Y-%m-%d %H:%M UTC")
        );
        if let (Some(origin), Some(destination)) =
            (&visitor.last_origin, &visitor.last_destination)
        {
            line.push_str(&format!(" ({} -> {})", origin, destination));
        }
        lines.push(line);
    }

    if let Some(facts) = &flight.facts {
        lines.push(format!("Fact: {}", facts));
    }

    lines.join("\n")
}

/// Telegram Bot API sink.
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: Client, config: TelegramConfig) -> Self {
        Self {
            client,
            bot_token: config.bot_token,
            chat_id: config.chat_id,
        }
    }

    async fn call(&self, method: &str, body: serde_json::Value) {
        let url = format!("https://api.telegram.org/bot{}/{}", self.bot_token, method);
        let result = self
            .client
            .post(&url)
            .json(&body)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                warn!("Telegram {} failed with {}: {}", method, status, text);
            }
            Err(err) => warn!("Telegram {} failed: {:#}", method, err),
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn notify_flight(
        &self,
        flight: &EnrichedFlight,
        direction: Direction,
        eta_seconds: f64,
        visitor: Option<&RepeatVisitorRecord>,
    ) {
        let message = format_flight_message(flight, direction, eta_seconds, visitor);
        match &flight.photo_url {
            Some(photo_url) => {
                self.call(
                    "sendPhoto",
                    json!({
                        "chat_id": self.chat_id,
                        "photo": photo_url,
                        "caption": message,
                    }),
                )
                .await;
            }
            None => {
                self.call(
                    "sendMessage",
                    json!({
                        "chat_id": self.chat_id,
                        "text": message,
                    }),
                )
                .await;
            }
        }
        metrics::counter!("notifications.sent", "sink" => "telegram").increment(1);
    }

    async fn send_status(&self, text: &str) {
        self.call(
            "sendMessage",
            json!({
                "chat_id": self.chat_id,
                "text": text,
            }),
        )
        .await;
    }
}

/// Fallback sink when Telegram is not configured: everything goes to the
/// operator log.
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify_flight(
        &self,
        flight: &EnrichedFlight,
        direction: Direction,
        eta_seconds: f64,
        visitor: Option<&RepeatVisitorRecord>,
    ) {
        info!(
            "NOTIFY\n{}",
            format_flight_message(flight, direction, eta_seconds, visitor)
        );
    }

    async fn send_status(&self, text: &str) {
        info!("STATUS {}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::{AircraftInfo, Airport, FlightFix, Route};
    use chrono::{TimeZone, Utc};

    #[test]
    fn message_includes_available_fields() {
        let flight = EnrichedFlight {
            fix: FlightFix {
                icao24: "484123".to_string(),
                callsign: Some("KLM123 ".to_string()),
                baro_altitude_m: Some(1500.0),
                distance_from_home_km: Some(9.5),
                ..Default::default()
            },
            route: Some(Route::new(
                Airport {
                    iata: Some("AMS".into()),
                    ..Default::default()
                },
                Airport {
                    iata: Some("LHR".into()),
                    ..Default::default()
                },
            )),
            aircraft: Some(AircraftInfo {
                type_name: Some("Boeing 737-800".into()),
                registration: Some("PH-BXA".into()),
                operator: Some("KLM".into()),
                ..Default::default()
            }),
            facts: Some("A fact.".into()),
            ..Default::default()
        };
        let visitor = RepeatVisitorRecord {
            prior_sightings: 3,
            last_seen: Utc.with_ymd_and_hms(2026, 8, 20, 10, 0, 0).unwrap(),
            last_origin: Some("AMS".into()),
            last_destination: Some("LHR".into()),
        };

        let message = format_flight_message(&flight, Direction::Towards, 95.0, Some(&visitor));
        assert!(message.contains("KLM123 (PH-BXA, Boeing 737-800)"));
        assert!(message.contains("Operated by KLM"));
        assert!(message.contains("AMS -> LHR"));
        assert!(message.contains("towards"));
        assert!(message.contains("95 s"));
        assert!(message.contains("3 prior sighting(s)"));
        assert!(message.contains("Fact: A fact."));
    }

    #[test]
    fn message_degrades_to_bare_fix() {
        let flight = EnrichedFlight {
            fix: FlightFix {
                icao24: "abcdef".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let message = format_flight_message(&flight, Direction::Overhead, 10.0, None);
        assert!(message.starts_with("abcdef"));
        assert!(message.contains("overhead"));
        assert!(!message.contains("Operated by"));
    }
}
