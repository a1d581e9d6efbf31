//! Values derived from a snapshot for display: condition text and icons,
//! air-quality and UV bands, wind direction, hourly strip and daily rows.
//!
//! Nothing here does I/O; the terminal renderer only lays these out.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::model::WeatherSnapshot;

/// Colour hint attached to a band. Renderers map it onto their palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Green,
    Yellow,
    Orange,
    Red,
    Purple,
    Maroon,
}

/// US AQI categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiLevel {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiLevel {
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi <= 50.0 {
            Self::Good
        } else if aqi <= 100.0 {
            Self::Moderate
        } else if aqi <= 150.0 {
            Self::UnhealthyForSensitiveGroups
        } else if aqi <= 200.0 {
            Self::Unhealthy
        } else if aqi <= 300.0 {
            Self::VeryUnhealthy
        } else {
            Self::Hazardous
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Self::Good => Tone::Green,
            Self::Moderate => Tone::Yellow,
            Self::UnhealthyForSensitiveGroups => Tone::Orange,
            Self::Unhealthy => Tone::Red,
            Self::VeryUnhealthy => Tone::Purple,
            Self::Hazardous => Tone::Maroon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl UvLevel {
    pub fn from_index(uv_index: f64) -> Self {
        if uv_index < 3.0 {
            Self::Low
        } else if uv_index < 6.0 {
            Self::Moderate
        } else if uv_index < 8.0 {
            Self::High
        } else if uv_index < 11.0 {
            Self::VeryHigh
        } else {
            Self::Extreme
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
            Self::Extreme => "Extreme",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Low => "Minimal sun protection needed",
            Self::Moderate => "Wear sunscreen & hat",
            Self::High => "Use SPF 30+ sunscreen",
            Self::VeryHigh => "Extra protection needed",
            Self::Extreme => "Avoid sun exposure",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Self::Low => Tone::Green,
            Self::Moderate => Tone::Yellow,
            Self::High => Tone::Orange,
            Self::VeryHigh => Tone::Red,
            Self::Extreme => Tone::Maroon,
        }
    }
}

fn normalize_degrees(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Arrow pointing where the wind blows *to*, in eight sectors.
pub fn wind_arrow(degrees: f64) -> &'static str {
    let d = normalize_degrees(degrees);

    if !(22.5..337.5).contains(&d) {
        "↓"
    } else if d < 67.5 {
        "↙"
    } else if d < 112.5 {
        "←"
    } else if d < 157.5 {
        "↖"
    } else if d < 202.5 {
        "↑"
    } else if d < 247.5 {
        "↗"
    } else if d < 292.5 {
        "→"
    } else {
        "↘"
    }
}

/// Sixteen-point compass label for the direction the wind comes from.
pub fn compass_point(degrees: f64) -> &'static str {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    let sector = (normalize_degrees(degrees) / 22.5).round() as usize % POINTS.len();
    POINTS[sector]
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionText {
    pub description: &'static str,
    pub icon: &'static str,
}

/// Description and icon for a WMO weather code, with night icons where they differ.
pub fn describe_weather(code: i32, is_day: bool) -> ConditionText {
    let (description, day_icon, night_icon) = match code {
        0 => ("Clear sky", "☀️", "🌙"),
        1 => ("Mainly clear", "🌤️", "🌙"),
        2 => ("Partly cloudy", "⛅", "🌤️"),
        3 => ("Overcast", "☁️", "☁️"),
        45 => ("Foggy", "🌫️", "🌫️"),
        48 => ("Depositing rime fog", "🌫️", "🌫️"),
        51 => ("Light drizzle", "🌦️", "🌦️"),
        53 => ("Moderate drizzle", "🌧️", "🌧️"),
        55 => ("Dense drizzle", "🌧️", "🌧️"),
        61 => ("Slight rain", "🌧️", "🌧️"),
        63 => ("Moderate rain", "🌧️", "🌧️"),
        65 => ("Heavy rain", "⛈️", "⛈️"),
        71 => ("Slight snow", "🌨️", "🌨️"),
        73 => ("Moderate snow", "🌨️", "🌨️"),
        75 => ("Heavy snow", "🌨️", "🌨️"),
        77 => ("Snow grains", "🌨️", "🌨️"),
        80 => ("Slight rain showers", "🌧️", "🌧️"),
        81 => ("Moderate rain showers", "🌧️", "🌧️"),
        82 => ("Violent rain showers", "⛈️", "⛈️"),
        85 => ("Slight snow showers", "🌨️", "🌨️"),
        86 => ("Heavy snow showers", "🌨️", "🌨️"),
        95 => ("Thunderstorm", "⛈️", "⛈️"),
        96 => ("Thunderstorm with slight hail", "⛈️", "⛈️"),
        99 => ("Thunderstorm with heavy hail", "⛈️", "⛈️"),
        _ => ("Unknown", "🌍", "🌍"),
    };

    ConditionText {
        description,
        icon: if is_day { day_icon } else { night_icon },
    }
}

/// `sunrise <= time < sunset`
pub fn is_daytime(time: NaiveDateTime, sunrise: NaiveDateTime, sunset: NaiveDateTime) -> bool {
    time >= sunrise && time < sunset
}

/// "06:05 AM", or "--:--" when unknown.
pub fn format_clock(time: Option<NaiveDateTime>) -> String {
    match time {
        Some(t) => t.format("%I:%M %p").to_string(),
        None => "--:--".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyEntry {
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub weather_code: i32,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub is_day: bool,
}

pub const HOURLY_WINDOW: usize = 24;

/// Up to `count` hours starting at the current local hour.
pub fn hourly_window(snapshot: &WeatherSnapshot, now: DateTime<Utc>, count: usize) -> Vec<HourlyEntry> {
    let start = snapshot.current_hour_index(now);
    let h = &snapshot.hourly;

    (start..h.time.len())
        .take(count)
        .map(|i| {
            let time = h.time[i];
            HourlyEntry {
                time,
                temperature: h.temperature_2m[i],
                weather_code: h.weather_code[i],
                precipitation: h.precipitation[i],
                wind_speed: h.wind_speed_10m[i],
                is_day: hour_is_day(snapshot, time),
            }
        })
        .collect()
}

/// Day/night for an arbitrary hour using that day's sunrise and sunset.
/// Hours outside the daily series count as day.
fn hour_is_day(snapshot: &WeatherSnapshot, time: NaiveDateTime) -> bool {
    let d = &snapshot.daily;
    d.time
        .iter()
        .position(|date| *date == time.date())
        .and_then(|i| Some((*d.sunrise.get(i)?, *d.sunset.get(i)?)))
        .is_none_or(|(sunrise, sunset)| is_daytime(time, sunrise, sunset))
}

/// Week (7 days) or extended (10 days) forecast view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DailyView {
    #[default]
    Week,
    Extended,
}

impl DailyView {
    pub fn days(&self) -> usize {
        match self {
            DailyView::Week => 7,
            DailyView::Extended => 10,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DailyView::Week => "7-Day Forecast",
            DailyView::Extended => "10-Day Forecast",
        }
    }

    /// Narrowest temperature bar, in percent.
    fn min_bar_percent(&self) -> f64 {
        match self {
            DailyView::Week => 10.0,
            DailyView::Extended => 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyEntry {
    pub date: NaiveDate,
    pub weather_code: i32,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub precipitation: f64,
    pub wind_speed_max: f64,
    pub is_today: bool,
    /// Width of the min/max bar as a percentage of a 30° span.
    pub range_percent: f64,
}

impl DailyEntry {
    /// Precipitation is only worth showing when some is expected.
    pub fn shows_precipitation(&self) -> bool {
        self.precipitation > 0.0
    }
}

pub fn daily_entries(snapshot: &WeatherSnapshot, view: DailyView, today: NaiveDate) -> Vec<DailyEntry> {
    let d = &snapshot.daily;

    d.time
        .iter()
        .enumerate()
        .take(view.days())
        .map(|(i, &date)| {
            let max = d.temperature_2m_max[i];
            let min = d.temperature_2m_min[i];
            DailyEntry {
                date,
                weather_code: d.weather_code[i],
                temperature_max: max,
                temperature_min: min,
                precipitation: d.precipitation[i],
                wind_speed_max: d.wind_speed_10m_max[i],
                is_today: date == today,
                range_percent: ((max - min) / 30.0 * 100.0).clamp(view.min_bar_percent(), 100.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_snapshot;
    use chrono::TimeZone;

    #[test]
    fn aqi_bands() {
        assert_eq!(AqiLevel::from_aqi(42.0).label(), "Good");
        assert_eq!(AqiLevel::from_aqi(50.0).label(), "Good");
        assert_eq!(AqiLevel::from_aqi(100.0).label(), "Moderate");
        assert_eq!(AqiLevel::from_aqi(120.0).label(), "Unhealthy for Sensitive Groups");
        assert_eq!(AqiLevel::from_aqi(151.0).label(), "Unhealthy");
        assert_eq!(AqiLevel::from_aqi(250.0).label(), "Very Unhealthy");
        assert_eq!(AqiLevel::from_aqi(301.0).label(), "Hazardous");
        assert_eq!(AqiLevel::from_aqi(301.0).tone(), Tone::Maroon);
    }

    #[test]
    fn uv_bands() {
        assert_eq!(UvLevel::from_index(2.5).label(), "Low");
        assert_eq!(UvLevel::from_index(3.0).label(), "Moderate");
        assert_eq!(UvLevel::from_index(7.9).label(), "High");
        assert_eq!(UvLevel::from_index(9.0).label(), "Very High");
        assert_eq!(UvLevel::from_index(11.0).label(), "Extreme");
        assert_eq!(UvLevel::from_index(9.0).recommendation(), "Extra protection needed");
    }

    #[test]
    fn wind_arrow_wraps_and_distinguishes_opposites() {
        assert_eq!(wind_arrow(0.0), wind_arrow(360.0));
        assert_eq!(wind_arrow(-45.0), wind_arrow(315.0));
        assert_ne!(wind_arrow(90.0), wind_arrow(270.0));
        assert_eq!(wind_arrow(90.0), "←");
        assert_eq!(wind_arrow(270.0), "→");
    }

    #[test]
    fn compass_points() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(359.0), "N");
        assert_eq!(compass_point(22.5), "NNE");
        assert_eq!(compass_point(225.0), "SW");
    }

    #[test]
    fn fahrenheit_conversion() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(celsius_to_fahrenheit(-40.0), -40.0);
    }

    #[test]
    fn weather_codes_have_day_and_night_icons() {
        assert_eq!(describe_weather(0, true).icon, "☀️");
        assert_eq!(describe_weather(0, false).icon, "🌙");
        assert_eq!(describe_weather(0, false).description, "Clear sky");
        assert_eq!(describe_weather(65, true).description, "Heavy rain");

        let unknown = describe_weather(42, true);
        assert_eq!(unknown.description, "Unknown");
        assert_eq!(unknown.icon, "🌍");
    }

    #[test]
    fn clock_formatting() {
        let t = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(18, 5, 0)
            .unwrap();
        assert_eq!(format_clock(Some(t)), "06:05 PM");
        assert_eq!(format_clock(None), "--:--");
    }

    #[test]
    fn hourly_window_starts_at_current_local_hour() {
        let snapshot = sample_snapshot(28.6, 77.2);
        // 08:40 UTC is 14:10 in UTC+05:30.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 40, 0).unwrap();

        let window = hourly_window(&snapshot, now, HOURLY_WINDOW);
        assert_eq!(window.len(), HOURLY_WINDOW);
        assert_eq!(window[0].time.format("%H:%M").to_string(), "14:00");
        assert!(window[0].is_day);
        // 21:00 local is after sunset.
        assert!(!window[7].is_day);
    }

    #[test]
    fn hourly_window_falls_back_to_start() {
        let snapshot = sample_snapshot(28.6, 77.2);
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        let window = hourly_window(&snapshot, now, 5);
        assert_eq!(window[0].time, snapshot.hourly.time[0]);
        assert_eq!(window.len(), 5);
    }

    #[test]
    fn daily_views_limit_days_and_flag_today() {
        let snapshot = sample_snapshot(28.6, 77.2);
        let today = snapshot.daily.time[1];

        let week = daily_entries(&snapshot, DailyView::Week, today);
        assert_eq!(week.len(), 7);
        assert!(!week[0].is_today);
        assert!(week[1].is_today);

        let extended = daily_entries(&snapshot, DailyView::Extended, today);
        assert_eq!(extended.len(), 10);
    }

    #[test]
    fn range_bar_has_a_floor() {
        let mut snapshot = sample_snapshot(0.0, 0.0);
        snapshot.daily.temperature_2m_max[0] = 20.0;
        snapshot.daily.temperature_2m_min[0] = 19.5;
        snapshot.daily.temperature_2m_max[1] = 30.0;
        snapshot.daily.temperature_2m_min[1] = 15.0;
        let today = snapshot.daily.time[0];

        let week = daily_entries(&snapshot, DailyView::Week, today);
        assert_eq!(week[0].range_percent, 10.0);
        assert_eq!(week[1].range_percent, 50.0);

        let extended = daily_entries(&snapshot, DailyView::Extended, today);
        assert_eq!(extended[0].range_percent, 20.0);
    }

    #[test]
    fn precipitation_only_shown_when_positive() {
        let snapshot = sample_snapshot(0.0, 0.0);
        let days = daily_entries(&snapshot, DailyView::Week, snapshot.daily.time[0]);
        assert!(!days[0].shows_precipitation());
        assert!(days[1].shows_precipitation());
    }
}
