//! Coarse IP geolocation
//!
//! One GET against an ip-api.com-style JSON endpoint, used to tag search
//! history entries with an approximate location. Strictly best-effort:
//! callers log failures and move on.

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default lookup endpoint (resolves the caller's public address)
pub const DEFAULT_ENDPOINT: &str = "http://ip-api.com/json";

/// Result of a geolocation lookup
#[derive(Debug, Clone, Deserialize)]
pub struct GeoLocation {
    #[serde(rename = "query", default)]
    pub ip: String,
    #[serde(default)]
    pub city: String,
    #[serde(rename = "regionName", default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
}

impl GeoLocation {
    /// "City, Region, Country" with empty parts omitted
    pub fn coarse(&self) -> String {
        [&self.city, &self.region, &self.country]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Client for the geolocation endpoint
#[derive(Debug, Clone)]
pub struct GeoLocator {
    client: Client,
    endpoint: String,
}

impl GeoLocator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub async fn lookup(&self) -> Result<GeoLocation> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("Failed to reach geolocation endpoint")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Geolocation lookup failed with status {}", status));
        }

        let location: GeoLocation = response
            .json()
            .await
            .context("Failed to parse geolocation response")?;

        if location.status != "success" {
            return Err(anyhow!(
                "Geolocation lookup failed: {}",
                location.message.as_deref().unwrap_or("unknown reason")
            ));
        }

        debug!("Resolved location: {}", location.coarse());
        Ok(location)
    }
}

impl Default for GeoLocator {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}
