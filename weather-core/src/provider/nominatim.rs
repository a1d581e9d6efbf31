//! Reverse geocoding through Nominatim (OpenStreetMap). Free, no API key,
//! but a descriptive User-Agent is mandatory.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{error::ProviderError, model::Coordinate};

use super::ReverseGeocoder;

#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: Client,
    url: String,
}

impl NominatimClient {
    pub fn new(url: &str, user_agent: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    async fn lookup(&self, coordinate: Coordinate) -> Result<NominatimResponse, ProviderError> {
        let service = "reverse geocoding";
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
            ])
            .send()
            .await
            .map_err(|source| ProviderError::Transport { service, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                service,
                status: status.as_u16(),
                body: String::new(),
            });
        }

        response.json().await.map_err(|e| ProviderError::Parse {
            service,
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    county: Option<String>,
}

impl NominatimAddress {
    /// city › town › county
    fn place_name(self) -> Option<String> {
        [self.city, self.town, self.county]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Option<String> {
        let body = match self.lookup(coordinate).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Reverse geocode for {} failed: {}", coordinate, e);
                return None;
            }
        };

        let name = body.address?.place_name()?;
        tracing::info!("Reverse geocoded {} to {}", coordinate, name);
        Some(name)
    }
}
