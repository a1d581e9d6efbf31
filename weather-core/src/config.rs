use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::Coordinate;

/// City used whenever no real position is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl DefaultLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl Default for DefaultLocation {
    fn default() -> Self {
        Self {
            name: "New Delhi".to_string(),
            latitude: 28.6139,
            longitude: 77.2090,
        }
    }
}

/// Base URLs of the remote services.
///
/// Example TOML:
/// [endpoints]
/// forecast_url = "https://api.open-meteo.com/v1/forecast"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub forecast_url: String,
    pub air_quality_url: String,
    pub geocoding_url: String,
    pub reverse_geocoding_url: String,
    pub ip_geolocation_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            air_quality_url: "https://air-quality-api.open-meteo.com/v1/air-quality".to_string(),
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            reverse_geocoding_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            ip_geolocation_url: "http://ip-api.com/json/".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_location: DefaultLocation,

    /// How long to wait for a position fix before falling back.
    pub geolocation_timeout_secs: u64,

    /// Upper bound on a reverse-geocoding lookup.
    pub reverse_geocode_timeout_secs: u64,

    /// Sent with every request; Nominatim rejects anonymous clients.
    pub user_agent: String,

    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_location: DefaultLocation::default(),
            geolocation_timeout_secs: 30,
            reverse_geocode_timeout_secs: 5,
            user_agent: concat!("weather-cli/", env!("CARGO_PKG_VERSION")).to_string(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs)
    }

    pub fn reverse_geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.reverse_geocode_timeout_secs)
    }

    /// Replace the fallback city.
    pub fn set_default_location(&mut self, name: impl Into<String>, coordinate: Coordinate) {
        self.default_location = DefaultLocation {
            name: name.into(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        };
    }

    /// Reject settings the resolver cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.default_location.name.trim().is_empty() {
            return Err(anyhow!("default_location.name must not be empty"));
        }
        if !self.default_location.coordinate().is_valid() {
            return Err(anyhow!(
                "default_location coordinates out of range: {}",
                self.default_location.coordinate()
            ));
        }
        if self.geolocation_timeout_secs == 0 {
            return Err(anyhow!("geolocation_timeout_secs must be greater than zero"));
        }
        if self.reverse_geocode_timeout_secs == 0 {
            return Err(anyhow!("reverse_geocode_timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
