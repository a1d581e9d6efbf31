//! Core library for the `weather` dashboard.
//!
//! This crate defines:
//! - Configuration and persistent key/value storage
//! - Location resolution (cache, geolocation, fallback city)
//! - Open-Meteo weather and geocoding clients, Nominatim reverse geocoding
//! - Favorites and theme preferences
//! - Display helpers (condition icons, AQI/UV bands, hourly and daily views)
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod cache;
pub mod config;
pub mod display;
pub mod error;
pub mod favorites;
pub mod geolocation;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod storage;
pub mod theme;

#[cfg(test)]
mod test_support;

pub use cache::LocationCache;
pub use config::{Config, DefaultLocation, Endpoints};
pub use error::{LocationError, ProviderError, ResolveError, StorageError};
pub use favorites::FavoritesStore;
pub use geolocation::{GeolocationOptions, Geolocator};
pub use model::{
    Coordinate, CurrentConditions, DailySeries, FavoriteLocation, HourlySeries, LocationCacheEntry,
    LocationData, WeatherSnapshot,
};
pub use provider::{
    LocationSearch, Providers, ReverseGeocoder, WeatherProvider, providers_from_config,
};
pub use resolver::{LocationResolver, LocationSource, Resolution, ResolverState};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use theme::{Theme, ThemeStore};
