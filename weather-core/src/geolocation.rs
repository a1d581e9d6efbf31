//! Position fixes.
//!
//! A terminal has no browser geolocation prompt, so the stock implementation
//! asks an IP geolocation service. [`DisabledGeolocator`] behaves like a user
//! who refused location access.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::{
    error::{LocationError, ProviderError},
    model::Coordinate,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeolocationOptions {
    pub timeout: Duration,
    pub enable_high_accuracy: bool,
    /// Oldest acceptable cached fix; zero forces a fresh one.
    pub maximum_age: Duration,
}

impl GeolocationOptions {
    /// Low accuracy, never reuse an earlier fix.
    pub fn fresh(timeout: Duration) -> Self {
        Self {
            timeout,
            enable_high_accuracy: false,
            maximum_age: Duration::ZERO,
        }
    }
}

#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn current_position(&self, options: &GeolocationOptions) -> Result<Coordinate, LocationError>;
}

/// Ask for a position, giving up after `options.timeout`.
///
/// The underlying request is not cancelled cooperatively; its result is just
/// ignored once the deadline has passed.
pub async fn locate(
    geolocator: &dyn Geolocator,
    options: &GeolocationOptions,
) -> Result<Coordinate, LocationError> {
    match tokio::time::timeout(options.timeout, geolocator.current_position(options)).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGeolocator;

#[async_trait]
impl Geolocator for DisabledGeolocator {
    async fn current_position(&self, _options: &GeolocationOptions) -> Result<Coordinate, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

/// Approximate position from the public IP address (ip-api.com).
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    http: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

impl IpGeolocator {
    pub fn new(url: &str, user_agent: &str) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current_position(&self, options: &GeolocationOptions) -> Result<Coordinate, LocationError> {
        tracing::debug!(
            "Requesting IP geolocation (high accuracy: {}, max age: {:?})",
            options.enable_high_accuracy,
            options.maximum_age
        );

        let response = self
            .http
            .get(&self.url)
            .query(&[("fields", "status,message,lat,lon")])
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LocationError::Timeout
                } else {
                    LocationError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 403 {
            return Err(LocationError::PermissionDenied);
        }
        if !status.is_success() {
            return Err(LocationError::Unavailable(format!("status {status}")));
        }

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(lat), Some(lon)) => {
                let coordinate = Coordinate::new(lat, lon);
                if coordinate.is_valid() {
                    Ok(coordinate)
                } else {
                    Err(LocationError::Unavailable(format!("invalid position {coordinate}")))
                }
            }
            _ => Err(LocationError::Unavailable(
                body.message.unwrap_or_else(|| "lookup failed".to_string()),
            )),
        }
    }
}
