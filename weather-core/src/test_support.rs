use chrono::{Duration, NaiveDate, NaiveTime, Utc};

use crate::model::{CurrentConditions, DailySeries, HourlySeries, WeatherSnapshot};

/// A ten-day snapshot in UTC+05:30 starting 2025-06-01, with 72 hourly entries.
pub fn sample_snapshot(latitude: f64, longitude: f64) -> WeatherSnapshot {
    let first_day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let midnight = first_day.and_time(NaiveTime::MIN);
    let sunrise = NaiveTime::from_hms_opt(5, 24, 0).unwrap();
    let sunset = NaiveTime::from_hms_opt(19, 14, 0).unwrap();

    let hours = 72;
    let hourly = HourlySeries {
        time: (0..hours).map(|h| midnight + Duration::hours(h)).collect(),
        temperature_2m: (0..hours).map(|h| 25.0 + (h % 24) as f64 / 2.0).collect(),
        weather_code: (0..hours).map(|h| if h % 24 < 12 { 0 } else { 2 }).collect(),
        precipitation: (0..hours).map(|h| if h % 5 == 0 { 0.4 } else { 0.0 }).collect(),
        wind_speed_10m: vec![3.0; hours as usize],
    };

    let days: Vec<NaiveDate> = (0..10).map(|d| first_day + Duration::days(d)).collect();
    let daily = DailySeries {
        weather_code: days.iter().enumerate().map(|(i, _)| if i % 2 == 0 { 2 } else { 61 }).collect(),
        temperature_2m_max: vec![38.0; days.len()],
        temperature_2m_min: vec![27.0; days.len()],
        precipitation: days.iter().enumerate().map(|(i, _)| if i % 2 == 0 { 0.0 } else { 4.2 }).collect(),
        wind_speed_10m_max: vec![6.5; days.len()],
        sunrise: days.iter().map(|d| d.and_time(sunrise)).collect(),
        sunset: days.iter().map(|d| d.and_time(sunset)).collect(),
        time: days,
    };

    WeatherSnapshot {
        current: CurrentConditions {
            temperature: 31.4,
            wind_speed: 3.2,
            wind_direction: 270.0,
            weather_code: 2,
            is_day: true,
            relative_humidity: 48.0,
            apparent_temperature: 33.0,
            pressure_msl: 1006.1,
            visibility: 24140.0,
            uv_index: 6.3,
            precipitation: 0.0,
            aqi: 158.0,
            sunrise: daily.sunrise.first().copied(),
            sunset: daily.sunset.first().copied(),
        },
        hourly,
        daily,
        timezone: "Asia/Kolkata".to_string(),
        utc_offset_seconds: 19_800,
        latitude,
        longitude,
        fetched_at: Utc::now(),
    }
}
