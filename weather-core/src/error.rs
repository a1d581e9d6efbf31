//! Typed errors for the weather core.
//!
//! Every error that can reach the dashboard has a `user_message()` suitable
//! for a banner; the `Display` impl keeps the technical detail for logs.

use thiserror::Error;

/// Failures talking to a remote provider (forecast, air quality, geocoding).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} request failed with status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to parse {service} response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ProviderError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderError::Transport { source, .. } if source.is_timeout() => {
                "The request timed out. Please try again."
            }
            ProviderError::Transport { .. } => "Unable to connect. Check your internet connection.",
            ProviderError::Status { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            ProviderError::Status { .. } => "The weather request was rejected.",
            ProviderError::Parse { .. } => "Received an unexpected response from the weather service.",
            ProviderError::Client(_) => "Could not initialise the network client.",
        }
    }
}

/// Reasons a position fix could not be obtained.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location request timed out")]
    Timeout,

    #[error("Location service unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the persistent key/value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
}

/// Terminal outcomes of a location resolution attempt.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to load weather data: {0}")]
    Weather(#[from] ProviderError),

    #[error("Failed to load weather for selected location: {0}")]
    SelectedWeather(#[source] ProviderError),

    #[error("Resolution superseded by a newer request")]
    Superseded,
}

impl ResolveError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ResolveError::Weather(_) => "Failed to load weather data",
            ResolveError::SelectedWeather(_) => "Failed to load weather for selected location",
            ResolveError::Superseded => "A newer location request replaced this one.",
        }
    }
}
