use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;

use crate::model::PlaceCandidate;

use super::{GeocodingProvider, truncate_body};

/// Forward geocoding through Nominatim (OpenStreetMap). Coordinates come back
/// as decimal strings and are kept that way.
#[derive(Debug, Clone)]
pub struct NominatimProvider {
    base_url: String,
    limit: u8,
    http: Client,
}

impl NominatimProvider {
    pub fn new(base_url: String, limit: u8, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            limit: limit.max(1),
            http,
        }
    }
}

#[async_trait]
impl GeocodingProvider for NominatimProvider {
    async fn search_places(&self, query: &str) -> Result<Vec<PlaceCandidate>> {
        let url = format!("{}/search", self.base_url);
        let limit = self.limit.to_string();

        let res = self
            .http
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", limit.as_str())])
            .send()
            .await
            .context("Failed to send request to Nominatim (search)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Nominatim search response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Nominatim search failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let places: Vec<PlaceCandidate> =
            serde_json::from_str(&body).context("Failed to parse Nominatim search JSON")?;

        tracing::debug!(query, results = places.len(), "place search finished");
        Ok(places)
    }
}
