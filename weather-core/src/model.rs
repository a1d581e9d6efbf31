use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// A point on the globe. Both the location cache and the favorites list use
/// exact equality of the two fields as their identity key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A place returned by the geocoding search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin2: Option<String>,
}

impl LocationData {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// "Name, Region" when a first-level region is known, otherwise just the name.
    pub fn display_name(&self) -> String {
        match self.admin1.as_deref() {
            Some(region) if !region.is_empty() => format!("{}, {}", self.name, region),
            _ => self.name.clone(),
        }
    }

    /// Secondary line shown under the name in lists: "Region, CC".
    pub fn region_line(&self) -> Option<String> {
        let region = self.admin1.as_deref().filter(|r| !r.is_empty())?;
        Some(match self.country_code.as_deref() {
            Some(cc) if !cc.is_empty() => format!("{region}, {cc}"),
            _ => region.to_string(),
        })
    }
}

/// The single-slot record of the last resolved location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCacheEntry {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    pub city_name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub is_real_location: bool,
}

impl LocationCacheEntry {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A saved location. Serialized flat, with the save time in epoch millis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteLocation {
    #[serde(flatten)]
    pub location: LocationData,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
}

impl FavoriteLocation {
    pub fn coordinate(&self) -> Coordinate {
        self.location.coordinate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// °C
    pub temperature: f64,
    /// km/h
    pub wind_speed: f64,
    /// Degrees, meteorological convention (direction the wind blows from).
    pub wind_direction: f64,
    pub weather_code: i32,
    pub is_day: bool,
    /// %
    pub relative_humidity: f64,
    /// °C
    pub apparent_temperature: f64,
    /// hPa
    pub pressure_msl: f64,
    /// metres
    pub visibility: f64,
    pub uv_index: f64,
    /// mm
    pub precipitation: f64,
    /// US AQI
    pub aqi: f64,
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
}

/// Hourly values as parallel series, aligned by index with `time`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    pub time: Vec<NaiveDateTime>,
    pub temperature_2m: Vec<f64>,
    pub weather_code: Vec<i32>,
    pub precipitation: Vec<f64>,
    pub wind_speed_10m: Vec<f64>,
}

/// Daily values as parallel series, one entry per day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    pub time: Vec<NaiveDate>,
    pub weather_code: Vec<i32>,
    pub temperature_2m_max: Vec<f64>,
    pub temperature_2m_min: Vec<f64>,
    pub precipitation: Vec<f64>,
    pub wind_speed_10m_max: Vec<f64>,
    pub sunrise: Vec<NaiveDateTime>,
    pub sunset: Vec<NaiveDateTime>,
}

/// Everything fetched for one coordinate. Replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    pub hourly: HourlySeries,
    pub daily: DailySeries,
    pub timezone: String,
    pub utc_offset_seconds: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Wall-clock time at the forecast location.
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.naive_utc() + Duration::seconds(i64::from(self.utc_offset_seconds))
    }

    /// Index of the hourly entry covering the current local hour, or 0 when
    /// the series does not contain it.
    pub fn current_hour_index(&self, now: DateTime<Utc>) -> usize {
        let local = self.local_time(now);
        let hour_start = local
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(local);

        self.hourly
            .time
            .iter()
            .position(|t| *t == hour_start)
            .unwrap_or(0)
    }
}
