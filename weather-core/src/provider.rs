use crate::{
    Config,
    error::ProviderError,
    geolocation::{DisabledGeolocator, Geolocator, IpGeolocator},
    model::{Coordinate, LocationData, WeatherSnapshot},
    provider::{nominatim::NominatimClient, open_meteo::OpenMeteoProvider},
};
use async_trait::async_trait;
use std::{cmp::Reverse, fmt::Debug, sync::Arc};

pub mod nominatim;
pub mod open_meteo;

/// Queries shorter than this never reach the network.
pub const MIN_QUERY_LEN: usize = 2;
/// Upper bound on returned search results.
pub const MAX_SEARCH_RESULTS: usize = 50;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions, hourly and daily series plus air quality.
    async fn get_weather(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, ProviderError>;
}

#[async_trait]
pub trait LocationSearch: Send + Sync + Debug {
    async fn search(&self, query: &str) -> Result<Vec<LocationData>, ProviderError>;
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync + Debug {
    /// Best-effort place name. Never fails; `None` means "no name found".
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Option<String>;
}

/// Everything the dashboard talks to, built from one config.
#[derive(Debug, Clone)]
pub struct Providers {
    pub weather: Arc<dyn WeatherProvider>,
    pub search: Arc<dyn LocationSearch>,
    pub reverse: Arc<dyn ReverseGeocoder>,
    pub geolocator: Arc<dyn Geolocator>,
}

/// Construct the provider set from config.
///
/// `use_geolocation = false` stands in for a user refusing location access.
pub fn providers_from_config(
    config: &Config,
    use_geolocation: bool,
) -> Result<Providers, ProviderError> {
    let open_meteo = Arc::new(OpenMeteoProvider::new(&config.endpoints, &config.user_agent)?);
    let reverse = Arc::new(NominatimClient::new(
        &config.endpoints.reverse_geocoding_url,
        &config.user_agent,
        config.reverse_geocode_timeout(),
    )?);

    let geolocator: Arc<dyn Geolocator> = if use_geolocation {
        Arc::new(IpGeolocator::new(
            &config.endpoints.ip_geolocation_url,
            &config.user_agent,
        )?)
    } else {
        Arc::new(DisabledGeolocator)
    };

    Ok(Providers {
        weather: open_meteo.clone(),
        search: open_meteo,
        reverse,
        geolocator,
    })
}

/// The trimmed query when it is long enough to search for.
pub fn searchable_query(query: &str) -> Option<&str> {
    let trimmed = query.trim();
    (trimmed.chars().count() >= MIN_QUERY_LEN).then_some(trimmed)
}

/// Exact (case-insensitive) name matches first, then larger places first.
/// Ties keep the provider's order.
pub fn rank_search_results(query: &str, mut results: Vec<LocationData>) -> Vec<LocationData> {
    let query = query.trim().to_lowercase();

    results.sort_by_key(|loc| {
        let inexact = loc.name.to_lowercase() != query;
        (inexact, Reverse(loc.population.unwrap_or(0)))
    });
    results.truncate(MAX_SEARCH_RESULTS);
    results
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
