use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;

use crate::{
    config::Endpoints,
    error::ProviderError,
    model::{Coordinate, CurrentConditions, DailySeries, HourlySeries, LocationData, WeatherSnapshot},
};

use super::{
    LocationSearch, MAX_SEARCH_RESULTS, WeatherProvider, rank_search_results, searchable_query,
    truncate_body,
};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,\
wind_speed_10m,wind_direction_10m,is_day,pressure_msl,visibility,uv_index,precipitation";
const HOURLY_FIELDS: &str = "temperature_2m,weather_code,precipitation,wind_speed_10m";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,precipitation_sum,\
wind_speed_10m_max,sunrise,sunset";
const FORECAST_DAYS: &str = "10";
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Open-Meteo forecast, air-quality and geocoding APIs. No API key required.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    forecast_url: String,
    air_quality_url: String,
    geocoding_url: String,
}

impl OpenMeteoProvider {
    pub fn new(endpoints: &Endpoints, user_agent: &str) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            http,
            forecast_url: endpoints.forecast_url.clone(),
            air_quality_url: endpoints.air_quality_url.clone(),
            geocoding_url: endpoints.geocoding_url.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| ProviderError::Transport { service, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ProviderError::Transport { service, source })?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                service,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Parse {
            service,
            message: e.to_string(),
        })
    }

    async fn fetch_forecast(&self, coordinate: Coordinate) -> Result<OmForecastResponse, ProviderError> {
        self.get_json(
            "forecast",
            &self.forecast_url,
            &[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
            ],
        )
        .await
    }

    async fn fetch_air_quality(&self, coordinate: Coordinate) -> Result<OmAirQualityResponse, ProviderError> {
        self.get_json(
            "air quality",
            &self.air_quality_url,
            &[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                ("current", "us_aqi".to_string()),
            ],
        )
        .await
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn get_weather(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, ProviderError> {
        let (forecast, air_quality) = tokio::try_join!(
            self.fetch_forecast(coordinate),
            self.fetch_air_quality(coordinate)
        )?;

        tracing::debug!(
            "Fetched forecast for {} ({} hourly, {} daily entries)",
            coordinate,
            forecast.hourly.time.len(),
            forecast.daily.time.len()
        );

        build_snapshot(forecast, air_quality)
    }
}

#[async_trait]
impl LocationSearch for OpenMeteoProvider {
    async fn search(&self, query: &str) -> Result<Vec<LocationData>, ProviderError> {
        let Some(query) = searchable_query(query) else {
            return Ok(Vec::new());
        };

        let parsed: OmSearchResponse = self
            .get_json(
                "geocoding",
                &self.geocoding_url,
                &[
                    ("name", query.to_string()),
                    ("count", MAX_SEARCH_RESULTS.to_string()),
                    ("language", "en".to_string()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;

        let results = parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .map(LocationData::from)
            .collect();

        Ok(rank_search_results(query, results))
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    weather_code: i32,
    is_day: u8,
    #[serde(default)]
    relative_humidity_2m: Option<f64>,
    #[serde(default)]
    apparent_temperature: Option<f64>,
    #[serde(default)]
    wind_speed_10m: Option<f64>,
    #[serde(default)]
    wind_direction_10m: Option<f64>,
    #[serde(default)]
    pressure_msl: Option<f64>,
    #[serde(default)]
    visibility: Option<f64>,
    #[serde(default)]
    uv_index: Option<f64>,
    #[serde(default)]
    precipitation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    weather_code: Vec<Option<i32>>,
    precipitation: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<String>,
    weather_code: Vec<Option<i32>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
    sunrise: Vec<String>,
    sunset: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    latitude: f64,
    longitude: f64,
    timezone: String,
    #[serde(default)]
    utc_offset_seconds: i32,
    current: OmCurrent,
    hourly: OmHourly,
    daily: OmDaily,
}

#[derive(Debug, Deserialize)]
struct OmAirQualityCurrent {
    #[serde(default)]
    us_aqi: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OmAirQualityResponse {
    current: OmAirQualityCurrent,
}

#[derive(Debug, Deserialize)]
struct OmGeoResult {
    id: i64,
    name: String,
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
    feature_code: Option<String>,
    country_code: Option<String>,
    timezone: Option<String>,
    population: Option<u64>,
    country: Option<String>,
    admin1: Option<String>,
    admin2: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmSearchResponse {
    #[serde(default)]
    results: Option<Vec<OmGeoResult>>,
}

impl From<OmGeoResult> for LocationData {
    fn from(r: OmGeoResult) -> Self {
        LocationData {
            id: r.id,
            name: r.name,
            latitude: r.latitude,
            longitude: r.longitude,
            elevation: r.elevation,
            feature_code: r.feature_code,
            country_code: r.country_code,
            timezone: r.timezone,
            population: r.population,
            country: r.country,
            admin1: r.admin1,
            admin2: r.admin2,
        }
    }
}

fn build_snapshot(
    forecast: OmForecastResponse,
    air_quality: OmAirQualityResponse,
) -> Result<WeatherSnapshot, ProviderError> {
    let hourly = build_hourly(forecast.hourly)?;
    let daily = build_daily(forecast.daily)?;
    let c = forecast.current;

    let current = CurrentConditions {
        temperature: c.temperature_2m,
        wind_speed: c.wind_speed_10m.unwrap_or(0.0),
        wind_direction: c.wind_direction_10m.unwrap_or(0.0),
        weather_code: c.weather_code,
        is_day: c.is_day == 1,
        relative_humidity: c.relative_humidity_2m.unwrap_or(0.0),
        apparent_temperature: c.apparent_temperature.unwrap_or(c.temperature_2m),
        pressure_msl: c.pressure_msl.unwrap_or(0.0),
        visibility: c.visibility.unwrap_or(0.0),
        uv_index: c.uv_index.unwrap_or(0.0),
        precipitation: c.precipitation.unwrap_or(0.0),
        aqi: air_quality.current.us_aqi.unwrap_or(0.0),
        sunrise: daily.sunrise.first().copied(),
        sunset: daily.sunset.first().copied(),
    };

    Ok(WeatherSnapshot {
        current,
        hourly,
        daily,
        timezone: forecast.timezone,
        utc_offset_seconds: forecast.utc_offset_seconds,
        latitude: forecast.latitude,
        longitude: forecast.longitude,
        fetched_at: Utc::now(),
    })
}

fn build_hourly(h: OmHourly) -> Result<HourlySeries, ProviderError> {
    let len = h.time.len();
    ensure_aligned(
        "hourly",
        len,
        &[
            h.temperature_2m.len(),
            h.weather_code.len(),
            h.precipitation.len(),
            h.wind_speed_10m.len(),
        ],
    )?;

    Ok(HourlySeries {
        time: h
            .time
            .iter()
            .map(|t| parse_local_datetime(t))
            .collect::<Result<_, _>>()?,
        temperature_2m: fill(h.temperature_2m),
        weather_code: fill(h.weather_code),
        precipitation: fill(h.precipitation),
        wind_speed_10m: fill(h.wind_speed_10m),
    })
}

fn build_daily(d: OmDaily) -> Result<DailySeries, ProviderError> {
    let len = d.time.len();
    ensure_aligned(
        "daily",
        len,
        &[
            d.weather_code.len(),
            d.temperature_2m_max.len(),
            d.temperature_2m_min.len(),
            d.precipitation_sum.len(),
            d.wind_speed_10m_max.len(),
            d.sunrise.len(),
            d.sunset.len(),
        ],
    )?;

    Ok(DailySeries {
        time: d
            .time
            .iter()
            .map(|t| parse_date(t))
            .collect::<Result<_, _>>()?,
        weather_code: fill(d.weather_code),
        temperature_2m_max: fill(d.temperature_2m_max),
        temperature_2m_min: fill(d.temperature_2m_min),
        precipitation: fill(d.precipitation_sum),
        wind_speed_10m_max: fill(d.wind_speed_10m_max),
        sunrise: d
            .sunrise
            .iter()
            .map(|t| parse_local_datetime(t))
            .collect::<Result<_, _>>()?,
        sunset: d
            .sunset
            .iter()
            .map(|t| parse_local_datetime(t))
            .collect::<Result<_, _>>()?,
    })
}

fn ensure_aligned(series: &str, len: usize, others: &[usize]) -> Result<(), ProviderError> {
    if others.iter().all(|&n| n == len) {
        Ok(())
    } else {
        Err(ProviderError::Parse {
            service: "forecast",
            message: format!("{series} series have mismatched lengths"),
        })
    }
}

fn fill<T: Default>(values: Vec<Option<T>>) -> Vec<T> {
    values.into_iter().map(Option::unwrap_or_default).collect()
}

fn parse_local_datetime(s: &str) -> Result<NaiveDateTime, ProviderError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| ProviderError::Parse {
            service: "forecast",
            message: format!("invalid timestamp '{s}': {e}"),
        })
}

fn parse_date(s: &str) -> Result<NaiveDate, ProviderError> {
    s.parse::<NaiveDate>().map_err(|e| ProviderError::Parse {
        service: "forecast",
        message: format!("invalid date '{s}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoints(base: &str) -> Endpoints {
        Endpoints {
            forecast_url: format!("{base}/v1/forecast"),
            air_quality_url: format!("{base}/v1/air-quality"),
            geocoding_url: format!("{base}/v1/search"),
            ..Endpoints::default()
        }
    }

    fn forecast_body() -> serde_json::Value {
        json!({
            "latitude": 28.625,
            "longitude": 77.25,
            "timezone": "Asia/Kolkata",
            "utc_offset_seconds": 19800,
            "current": {
                "temperature_2m": 31.4,
                "relative_humidity_2m": 48,
                "apparent_temperature": 33.0,
                "weather_code": 2,
                "wind_speed_10m": 3.2,
                "wind_direction_10m": 270,
                "is_day": 1,
                "pressure_msl": 1006.1,
                "visibility": 24140,
                "uv_index": 6.3,
                "precipitation": 0.0
            },
            "hourly": {
                "time": ["2025-06-01T00:00", "2025-06-01T01:00"],
                "temperature_2m": [29.1, null],
                "weather_code": [0, 1],
                "precipitation": [0.0, 0.2],
                "wind_speed_10m": [2.0, 2.5]
            },
            "daily": {
                "time": ["2025-06-01", "2025-06-02"],
                "weather_code": [2, 61],
                "temperature_2m_max": [38.0, 35.5],
                "temperature_2m_min": [27.0, 26.1],
                "precipitation_sum": [0.0, 4.2],
                "wind_speed_10m_max": [5.1, 7.8],
                "sunrise": ["2025-06-01T05:24", "2025-06-02T05:24"],
                "sunset": ["2025-06-01T19:14", "2025-06-02T19:15"]
            }
        })
    }

    async fn mount_forecast(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("timezone", "auto"))
            .and(query_param("forecast_days", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn get_weather_joins_forecast_and_air_quality() {
        let server = MockServer::start().await;
        mount_forecast(&server, forecast_body()).await;
        Mock::given(method("GET"))
            .and(path("/v1/air-quality"))
            .and(query_param("current", "us_aqi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current": { "us_aqi": 158 }
            })))
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(&endpoints(&server.uri()), "test").unwrap();
        let snapshot = provider
            .get_weather(Coordinate::new(28.6139, 77.2090))
            .await
            .unwrap();

        assert_eq!(snapshot.current.temperature, 31.4);
        assert!(snapshot.current.is_day);
        assert_eq!(snapshot.current.aqi, 158.0);
        assert_eq!(snapshot.timezone, "Asia/Kolkata");
        assert_eq!(snapshot.utc_offset_seconds, 19800);
        assert_eq!(snapshot.hourly.time.len(), 2);
        assert_eq!(snapshot.hourly.temperature_2m, vec![29.1, 0.0]);
        assert_eq!(snapshot.daily.precipitation, vec![0.0, 4.2]);
        assert_eq!(
            snapshot.current.sunrise,
            Some(parse_local_datetime("2025-06-01T05:24").unwrap())
        );
    }

    #[tokio::test]
    async fn missing_aqi_defaults_to_zero() {
        let server = MockServer::start().await;
        mount_forecast(&server, forecast_body()).await;
        Mock::given(method("GET"))
            .and(path("/v1/air-quality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current": { "us_aqi": null }
            })))
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(&endpoints(&server.uri()), "test").unwrap();
        let snapshot = provider.get_weather(Coordinate::new(0.0, 0.0)).await.unwrap();
        assert_eq!(snapshot.current.aqi, 0.0);
    }

    #[tokio::test]
    async fn failing_air_quality_fails_the_fetch() {
        let server = MockServer::start().await;
        mount_forecast(&server, forecast_body()).await;
        Mock::given(method("GET"))
            .and(path("/v1/air-quality"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(&endpoints(&server.uri()), "test").unwrap();
        let err = provider.get_weather(Coordinate::new(0.0, 0.0)).await.unwrap_err();

        assert!(matches!(err, ProviderError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn unparseable_forecast_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/air-quality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current": { "us_aqi": 10 }
            })))
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(&endpoints(&server.uri()), "test").unwrap();
        let err = provider.get_weather(Coordinate::new(0.0, 0.0)).await.unwrap_err();

        assert!(matches!(err, ProviderError::Parse { service: "forecast", .. }));
    }

    #[tokio::test]
    async fn misaligned_series_are_rejected() {
        let server = MockServer::start().await;
        let mut body = forecast_body();
        body["hourly"]["weather_code"] = json!([0]);
        mount_forecast(&server, body).await;
        Mock::given(method("GET"))
            .and(path("/v1/air-quality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current": { "us_aqi": 10 }
            })))
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(&endpoints(&server.uri()), "test").unwrap();
        let err = provider.get_weather(Coordinate::new(0.0, 0.0)).await.unwrap_err();
        assert!(err.to_string().contains("mismatched"));
    }

    #[tokio::test]
    async fn search_ranks_exact_matches_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "london"))
            .and(query_param("count", "50"))
            .and(query_param("language", "en"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    { "id": 1, "name": "Londonderry", "latitude": 55.0, "longitude": -7.3, "population": 90000 },
                    { "id": 2, "name": "London", "latitude": 42.98, "longitude": -81.23, "population": 346765, "admin1": "Ontario", "country_code": "CA" },
                    { "id": 3, "name": "London", "latitude": 51.51, "longitude": -0.13, "population": 7556900, "admin1": "England", "country_code": "GB" }
                ]
            })))
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(&endpoints(&server.uri()), "test").unwrap();
        let results = provider.search("london").await.unwrap();

        let ids: Vec<_> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids, [3, 2, 1]);
        assert_eq!(results[0].country_code.as_deref(), Some("GB"));
        assert_eq!(results[0].display_name(), "London, England");
    }

    #[tokio::test]
    async fn search_without_results_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "generationtime_ms": 0.5 })))
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(&endpoints(&server.uri()), "test").unwrap();
        assert!(provider.search("zzzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_query_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(&endpoints(&server.uri()), "test").unwrap();
        assert!(provider.search("a").await.unwrap().is_empty());
        assert!(provider.search("").await.unwrap().is_empty());

        server.verify().await;
    }
}
