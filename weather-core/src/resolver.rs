//! Location resolution.
//!
//! Decides which coordinate the dashboard shows (cached, freshly located or
//! the configured fallback city), names it, fetches its weather and records
//! the outcome in the location cache.
//!
//! ```text
//! Idle ──trigger──▶ Resolving ──ok──▶ Ready
//!                       └─────err───▶ Failed
//! ```
//!
//! Every trigger takes a new generation number. When a trigger finishes after
//! a newer one has started, its result is dropped with
//! [`ResolveError::Superseded`] and neither the state nor the cache change.

use chrono::Utc;
use parking_lot::Mutex;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::{
    cache::LocationCache,
    config::{Config, DefaultLocation},
    error::{LocationError, ProviderError, ResolveError},
    geolocation::{GeolocationOptions, Geolocator, locate},
    model::{Coordinate, LocationData, WeatherSnapshot},
    provider::{ReverseGeocoder, WeatherProvider},
};

/// Name shown for a real position that could not be reverse geocoded.
pub const PLACEHOLDER_CITY: &str = "Your Location";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    Cache,
    Geolocation,
    DefaultCity,
    Search,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub coordinate: Coordinate,
    pub city_name: String,
    pub snapshot: WeatherSnapshot,
    pub source: LocationSource,
    /// The position is not the user's own (denied, timed out, or cached as such).
    pub location_denied: bool,
    /// Advisory shown alongside the weather, e.g. after a denied location request.
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResolverState {
    #[default]
    Idle,
    Resolving,
    Ready(Box<Resolution>),
    Failed(String),
}

/// Where to fetch weather for, before any network call has happened.
#[derive(Debug, Clone)]
struct Target {
    coordinate: Coordinate,
    city_name: String,
    is_real_location: bool,
    source: LocationSource,
    notice: Option<String>,
}

#[derive(Debug)]
pub struct LocationResolver {
    weather: Arc<dyn WeatherProvider>,
    reverse: Arc<dyn ReverseGeocoder>,
    geolocator: Arc<dyn Geolocator>,
    cache: LocationCache,
    default_location: DefaultLocation,
    geolocation_timeout: Duration,
    reverse_geocode_timeout: Duration,
    generation: AtomicU64,
    location_denied: AtomicBool,
    state: Mutex<ResolverState>,
}

impl LocationResolver {
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        reverse: Arc<dyn ReverseGeocoder>,
        geolocator: Arc<dyn Geolocator>,
        cache: LocationCache,
        config: &Config,
    ) -> Self {
        Self {
            weather,
            reverse,
            geolocator,
            cache,
            default_location: config.default_location.clone(),
            geolocation_timeout: config.geolocation_timeout(),
            reverse_geocode_timeout: config.reverse_geocode_timeout(),
            generation: AtomicU64::new(0),
            location_denied: AtomicBool::new(false),
            state: Mutex::new(ResolverState::Idle),
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state.lock().clone()
    }

    /// Whether the last location attempt ended without a real position.
    pub fn location_denied(&self) -> bool {
        self.location_denied.load(Ordering::SeqCst)
    }

    /// Page-load resolution: fresh cache entry, else geolocation, else default city.
    pub async fn resolve_on_load(&self) -> Result<Resolution, ResolveError> {
        let generation = self.begin();

        let target = match self.cache.load(Utc::now()) {
            Some(entry) => {
                tracing::info!("Using cached location {} ({})", entry.city_name, entry.coordinate());
                self.location_denied
                    .store(!entry.is_real_location, Ordering::SeqCst);
                Target {
                    coordinate: entry.coordinate(),
                    city_name: entry.city_name,
                    is_real_location: entry.is_real_location,
                    source: LocationSource::Cache,
                    notice: None,
                }
            }
            None => self.locate_or_default(generation).await?,
        };

        self.complete(generation, target).await
    }

    /// Explicit "use current location": always asks for a fresh position.
    pub async fn use_current_location(&self) -> Result<Resolution, ResolveError> {
        let generation = self.begin();
        if let Some(entry) = self.cache.load(Utc::now()) {
            // Only the denial flag is reused; the cached position is not.
            self.location_denied
                .fetch_or(!entry.is_real_location, Ordering::SeqCst);
        }
        let target = self.locate_or_default(generation).await?;
        self.complete(generation, target).await
    }

    /// A place picked from search results. The name is already known, so
    /// neither geolocation nor reverse geocoding runs, and the cache records
    /// it as not being the user's own position.
    pub async fn select_location(&self, location: &LocationData) -> Result<Resolution, ResolveError> {
        let generation = self.begin();
        let target = Target {
            coordinate: location.coordinate(),
            city_name: location.display_name(),
            is_real_location: false,
            source: LocationSource::Search,
            notice: None,
        };

        self.complete(generation, target).await
    }

    fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.lock() = ResolverState::Resolving;
        tracing::debug!("Starting location resolution #{}", generation);
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn ensure_current(&self, generation: u64) -> Result<(), ResolveError> {
        if self.is_current(generation) {
            Ok(())
        } else {
            tracing::debug!("Dropping superseded resolution #{}", generation);
            Err(ResolveError::Superseded)
        }
    }

    async fn locate_or_default(&self, generation: u64) -> Result<Target, ResolveError> {
        let previously_denied = self.location_denied();
        let options = GeolocationOptions::fresh(self.geolocation_timeout);
        let result = locate(self.geolocator.as_ref(), &options).await;
        self.ensure_current(generation)?;

        let target = match result {
            Ok(coordinate) => {
                self.location_denied.store(false, Ordering::SeqCst);
                Target {
                    coordinate,
                    city_name: PLACEHOLDER_CITY.to_string(),
                    is_real_location: true,
                    source: LocationSource::Geolocation,
                    notice: None,
                }
            }
            Err(e) => {
                tracing::debug!("Geolocation failed ({}), using {}", e, self.default_location.name);
                self.location_denied.store(true, Ordering::SeqCst);
                Target {
                    coordinate: self.default_location.coordinate(),
                    city_name: self.default_location.name.clone(),
                    is_real_location: false,
                    source: LocationSource::DefaultCity,
                    notice: Some(denied_notice(&e, previously_denied, &self.default_location.name)),
                }
            }
        };

        Ok(target)
    }

    async fn complete(&self, generation: u64, mut target: Target) -> Result<Resolution, ResolveError> {
        if target.is_real_location && target.source == LocationSource::Geolocation {
            target.city_name = self.city_name_for(target.coordinate).await;
            self.ensure_current(generation)?;
        }

        let fetched = self.weather.get_weather(target.coordinate).await;
        self.finish(generation, target, fetched)
    }

    async fn city_name_for(&self, coordinate: Coordinate) -> String {
        let lookup = self.reverse.reverse_geocode(coordinate);
        match tokio::time::timeout(self.reverse_geocode_timeout, lookup).await {
            Ok(Some(name)) => name,
            Ok(None) => PLACEHOLDER_CITY.to_string(),
            Err(_) => {
                tracing::debug!("Reverse geocode for {} timed out", coordinate);
                PLACEHOLDER_CITY.to_string()
            }
        }
    }

    /// Publish the outcome, unless a newer trigger has started meanwhile.
    fn finish(
        &self,
        generation: u64,
        target: Target,
        fetched: Result<WeatherSnapshot, ProviderError>,
    ) -> Result<Resolution, ResolveError> {
        let mut state = self.state.lock();
        self.ensure_current(generation)?;

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let err = match target.source {
                    LocationSource::Search => ResolveError::SelectedWeather(e),
                    _ => ResolveError::Weather(e),
                };
                tracing::warn!("Resolution #{} failed: {}", generation, err);
                *state = ResolverState::Failed(err.user_message().to_string());
                return Err(err);
            }
        };

        if let Err(e) = self.cache.store(
            target.coordinate,
            &target.city_name,
            target.is_real_location,
            Utc::now(),
        ) {
            tracing::warn!("Failed to cache resolved location: {}", e);
        }

        let resolution = Resolution {
            coordinate: target.coordinate,
            city_name: target.city_name,
            snapshot,
            source: target.source,
            location_denied: !target.is_real_location && target.source != LocationSource::Search,
            notice: target.notice,
        };

        tracing::info!(
            "Resolved {} at {} via {:?}",
            resolution.city_name,
            resolution.coordinate,
            resolution.source
        );
        *state = ResolverState::Ready(Box::new(resolution.clone()));
        Ok(resolution)
    }
}

fn denied_notice(error: &LocationError, previously_denied: bool, fallback: &str) -> String {
    let reason = if previously_denied {
        "Location access is still unavailable. Check your location settings and try again."
    } else {
        match error {
            LocationError::PermissionDenied => "Location access denied.",
            LocationError::Timeout => "Location request timed out.",
            LocationError::Unavailable(_) => "Your location could not be determined.",
        }
    };
    format!("{reason} Showing weather for {fallback}.")
}
