//! planespotters.net photo lookup.
//!
//! Tries the hex address first and falls back to the registration, mirroring
//! how spotters index their uploads.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::enricher::PhotoLookup;

#[derive(Clone)]
pub struct PlanespottersClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PhotosResponse {
    #[serde(default)]
    photos: Vec<RawPhoto>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    thumbnail_large: Option<PhotoVariant>,
    thumbnail: Option<PhotoVariant>,
}

#[derive(Debug, Deserialize)]
struct PhotoVariant {
    src: String,
}

impl RawPhoto {
    fn best_src(self) -> Option<String> {
        self.thumbnail_large
            .or(self.thumbnail)
            .map(|variant| variant.src)
    }
}

impl PlanespottersClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: "https://api.planespotters.net".to_string(),
        }
    }

    async fn fetch_first_photo(&self, path: &str) -> Result<Option<String>> {
        let url = format!("{}/pub/photos/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .with_context(|| format!("Failed to query planespotters {}", path))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by planespotters");
            return Err(anyhow!("Rate limited by planespotters"));
        }
        if !status.is_success() {
            return Err(anyhow!("planespotters error {} for {}", status, path));
        }

        let payload: PhotosResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse planespotters response for {}", path))?;
        Ok(payload.photos.into_iter().find_map(RawPhoto::best_src))
    }
}

#[async_trait]
impl PhotoLookup for PlanespottersClient {
    async fn lookup_photo(
        &self,
        icao24: &str,
        registration: Option<&str>,
    ) -> Result<Option<String>> {
        match self.fetch_first_photo(&format!("hex/{}", icao24)).await {
            Ok(Some(url)) => return Ok(Some(url)),
            Ok(None) => debug!("No photo by hex for {}, trying registration", icao24),
            Err(err) => warn!("Photo lookup by hex failed for {}: {:#}", icao24, err),
        }

        match registration {
            Some(reg) => self.fetch_first_photo(&format!("reg/{}", reg)).await,
            None => Ok(None),
        }
    }
}
