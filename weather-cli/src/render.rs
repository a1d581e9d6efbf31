//! Terminal rendering of the dashboard.

use chrono::{DateTime, Utc};
use crossterm::style::{Color, Stylize};
use std::fmt::{self, Write};

use weather_core::{
    FavoriteLocation, LocationData, Resolution, Theme,
    display::{
        AqiLevel, DailyView, HOURLY_WINDOW, Tone, UvLevel, celsius_to_fahrenheit, compass_point,
        daily_entries, describe_weather, format_clock, hourly_window, is_daytime, wind_arrow,
    },
};

const BAR_WIDTH: usize = 10;

/// Colours derived from the active theme. `color = false` prints plain text.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    theme: Theme,
    color: bool,
}

impl Renderer {
    pub fn new(theme: Theme, color: bool) -> Self {
        Self { theme, color }
    }

    fn paint(&self, text: impl fmt::Display, color: Color) -> String {
        if self.color {
            text.to_string().with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        let color = match self.theme {
            Theme::Light => Color::DarkBlue,
            Theme::Dark => Color::Cyan,
        };
        if self.color {
            text.to_string().with(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: impl fmt::Display) -> String {
        let color = match self.theme {
            Theme::Light => Color::DarkGrey,
            Theme::Dark => Color::Grey,
        };
        self.paint(text, color)
    }

    fn toned(&self, text: impl fmt::Display, tone: Tone) -> String {
        let color = match tone {
            Tone::Green => Color::Green,
            Tone::Yellow => Color::Yellow,
            Tone::Orange => Color::AnsiValue(208),
            Tone::Red => Color::Red,
            Tone::Purple => Color::Magenta,
            Tone::Maroon => Color::DarkRed,
        };
        self.paint(text, color)
    }

    pub fn notice(&self, message: &str) -> String {
        self.paint(format!("⚠ {message}"), Color::Yellow)
    }

    pub fn error(&self, message: &str) -> String {
        self.paint(format!("✖ {message}"), Color::Red)
    }

    pub fn dashboard(
        &self,
        resolution: &Resolution,
        is_favorite: bool,
        view: DailyView,
        now: DateTime<Utc>,
    ) -> Result<String, fmt::Error> {
        let mut out = String::new();
        self.write_header(&mut out, resolution, is_favorite, now)?;
        self.write_current(&mut out, resolution, now)?;
        self.write_details(&mut out, resolution)?;
        self.write_hourly(&mut out, resolution, now)?;
        self.write_daily(&mut out, resolution, view, now)?;
        Ok(out)
    }

    fn write_header(
        &self,
        out: &mut String,
        resolution: &Resolution,
        is_favorite: bool,
        now: DateTime<Utc>,
    ) -> fmt::Result {
        let snapshot = &resolution.snapshot;
        let star = if is_favorite { " ★" } else { "" };
        writeln!(out, "📍 {}{}", self.heading(&resolution.city_name), star)?;

        let updated = snapshot.local_time(now).format("%H:%M");
        writeln!(
            out,
            "   {}",
            self.muted(format!(
                "{} · {} · Updated {}",
                resolution.coordinate, snapshot.timezone, updated
            ))
        )?;

        match &resolution.notice {
            Some(notice) => writeln!(out, "{}", self.notice(notice))?,
            None if resolution.location_denied => writeln!(
                out,
                "   {}",
                self.muted("Showing fallback city; run `weather current` to retry your location.")
            )?,
            None => {}
        }
        writeln!(out)
    }

    fn write_current(&self, out: &mut String, resolution: &Resolution, now: DateTime<Utc>) -> fmt::Result {
        let snapshot = &resolution.snapshot;
        let current = &snapshot.current;
        let local = snapshot.local_time(now);

        let is_day = match (current.sunrise, current.sunset) {
            (Some(sunrise), Some(sunset)) => is_daytime(local, sunrise, sunset),
            _ => current.is_day,
        };
        let condition = describe_weather(current.weather_code, is_day);

        writeln!(out, "{} {}", condition.icon, condition.description)?;
        writeln!(
            out,
            "   {}   {}",
            self.heading(&format!(
                "{:.0}°C / {:.0}°F",
                current.temperature,
                celsius_to_fahrenheit(current.temperature)
            )),
            self.muted(format!("Feels like {:.0}°C", current.apparent_temperature))
        )?;
        writeln!(
            out,
            "   🌅 Sunrise {}   🌇 Sunset {}",
            format_clock(current.sunrise),
            format_clock(current.sunset)
        )?;
        writeln!(out)
    }

    fn write_details(&self, out: &mut String, resolution: &Resolution) -> fmt::Result {
        let current = &resolution.snapshot.current;
        let aqi = AqiLevel::from_aqi(current.aqi);
        let uv = UvLevel::from_index(current.uv_index);

        writeln!(out, "{}", self.heading("Details"))?;
        writeln!(
            out,
            "   Wind         {:.1} km/h {} {}",
            current.wind_speed,
            wind_arrow(current.wind_direction),
            compass_point(current.wind_direction)
        )?;
        writeln!(out, "   Humidity     {:.0}%", current.relative_humidity)?;
        writeln!(out, "   Pressure     {:.0} hPa", current.pressure_msl)?;
        writeln!(out, "   Visibility   {:.1} km", current.visibility / 1000.0)?;
        writeln!(out, "   Precip       {:.1} mm", current.precipitation)?;
        writeln!(
            out,
            "   UV index     {:.1} {} · {}",
            current.uv_index,
            self.toned(uv.label(), uv.tone()),
            uv.recommendation()
        )?;
        writeln!(
            out,
            "   Air quality  {:.0} {}",
            current.aqi,
            self.toned(aqi.label(), aqi.tone())
        )?;
        writeln!(out)
    }

    fn write_hourly(&self, out: &mut String, resolution: &Resolution, now: DateTime<Utc>) -> fmt::Result {
        let hours = hourly_window(&resolution.snapshot, now, HOURLY_WINDOW);
        if hours.is_empty() {
            return Ok(());
        }

        writeln!(out, "{}", self.heading("Next 24 hours"))?;
        for hour in hours {
            let condition = describe_weather(hour.weather_code, hour.is_day);
            let precip = if hour.precipitation > 0.0 {
                format!("{:.1} mm", hour.precipitation)
            } else {
                String::new()
            };
            writeln!(
                out,
                "   {}  {}  {:>4.0}°  {:>9}  {}",
                self.muted(hour.time.format("%H:%M")),
                condition.icon,
                hour.temperature,
                format!("{:.1} km/h", hour.wind_speed),
                precip
            )?;
        }
        writeln!(out)
    }

    fn write_daily(
        &self,
        out: &mut String,
        resolution: &Resolution,
        view: DailyView,
        now: DateTime<Utc>,
    ) -> fmt::Result {
        let snapshot = &resolution.snapshot;
        let today = snapshot.local_time(now).date();

        writeln!(out, "{}", self.heading(view.title()))?;
        for day in daily_entries(snapshot, view, today) {
            let label = if day.is_today {
                "Today".to_string()
            } else {
                day.date.format("%a %d").to_string()
            };
            let filled = ((day.range_percent / 100.0) * BAR_WIDTH as f64).round() as usize;
            let bar = format!(
                "{}{}",
                "█".repeat(filled.min(BAR_WIDTH)),
                "░".repeat(BAR_WIDTH.saturating_sub(filled))
            );
            let precip = if day.shows_precipitation() {
                format!("💧 {:.1} mm", day.precipitation)
            } else {
                String::new()
            };

            writeln!(
                out,
                "   {:<6}  {}  {:>3.0}° {} {:.0}°  {}",
                label,
                describe_weather(day.weather_code, true).icon,
                day.temperature_min,
                self.toned(bar, Tone::Orange),
                day.temperature_max,
                precip
            )?;
        }
        Ok(())
    }

    pub fn location_line(&self, location: &LocationData) -> String {
        let region = location
            .region_line()
            .map(|r| format!(" {}", self.muted(format!("({r})"))))
            .unwrap_or_default();
        format!("{}{}", location.name, region)
    }

    pub fn favorites(&self, favorites: &[FavoriteLocation]) -> Result<String, fmt::Error> {
        let mut out = String::new();
        if favorites.is_empty() {
            writeln!(out, "{}", self.muted("No favorite locations yet."))?;
            return Ok(out);
        }

        writeln!(out, "{}", self.heading("Favorite locations"))?;
        for favorite in favorites {
            writeln!(
                out,
                "   ★ {}  {}",
                self.location_line(&favorite.location),
                self.muted(format!(
                    "{} · added {}",
                    favorite.coordinate(),
                    favorite.added_at.format("%Y-%m-%d")
                ))
            )?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, TimeZone};
    use weather_core::{
        Coordinate, CurrentConditions, DailySeries, HourlySeries, LocationSource, WeatherSnapshot,
    };

    fn at(date: NaiveDate, h: u32) -> NaiveDateTime {
        date.and_hms_opt(h, 0, 0).unwrap()
    }

    fn resolution(notice: Option<&str>) -> Resolution {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let days: Vec<NaiveDate> = (0..10).map(|d| day + chrono::Duration::days(d)).collect();
        let hours: Vec<NaiveDateTime> = (0..48).map(|h| at(day, 0) + chrono::Duration::hours(h)).collect();

        let snapshot = WeatherSnapshot {
            current: CurrentConditions {
                temperature: 20.0,
                wind_speed: 12.0,
                wind_direction: 90.0,
                weather_code: 0,
                is_day: true,
                relative_humidity: 55.0,
                apparent_temperature: 19.0,
                pressure_msl: 1013.0,
                visibility: 10_000.0,
                uv_index: 2.0,
                precipitation: 0.0,
                aqi: 42.0,
                sunrise: Some(at(day, 5)),
                sunset: Some(at(day, 21)),
            },
            hourly: HourlySeries {
                temperature_2m: vec![18.0; hours.len()],
                weather_code: vec![0; hours.len()],
                precipitation: vec![0.0; hours.len()],
                wind_speed_10m: vec![5.0; hours.len()],
                time: hours,
            },
            daily: DailySeries {
                weather_code: vec![61; days.len()],
                temperature_2m_max: vec![24.0; days.len()],
                temperature_2m_min: vec![12.0; days.len()],
                precipitation: vec![1.5; days.len()],
                wind_speed_10m_max: vec![20.0; days.len()],
                sunrise: days.iter().map(|d| at(*d, 5)).collect(),
                sunset: days.iter().map(|d| at(*d, 21)).collect(),
                time: days,
            },
            timezone: "UTC".into(),
            utc_offset_seconds: 0,
            latitude: 52.52,
            longitude: 13.4,
            fetched_at: Utc::now(),
        };

        Resolution {
            coordinate: Coordinate::new(52.52, 13.4),
            city_name: "Berlin".into(),
            snapshot,
            source: LocationSource::Geolocation,
            location_denied: false,
            notice: notice.map(str::to_string),
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn plain_dashboard_contains_every_section() {
        let renderer = Renderer::new(Theme::Light, false);
        let out = renderer
            .dashboard(&resolution(None), true, DailyView::Week, noon())
            .unwrap();

        assert!(out.contains("📍 Berlin ★"));
        assert!(out.contains("Clear sky"));
        assert!(out.contains("20°C / 68°F"));
        assert!(out.contains("Sunrise 05:00 AM"));
        assert!(out.contains("Sunset 09:00 PM"));
        assert!(out.contains("12.0 km/h ← E"));
        assert!(out.contains("Visibility   10.0 km"));
        assert!(out.contains("42 Good"));
        assert!(out.contains("Next 24 hours"));
        assert!(out.contains("7-Day Forecast"));
        assert!(out.contains("Today"));
        assert!(!out.contains('\u{1b}'), "no escape codes without colour");
    }

    #[test]
    fn hourly_strip_starts_at_current_hour() {
        let renderer = Renderer::new(Theme::Dark, false);
        let out = renderer
            .dashboard(&resolution(None), false, DailyView::Week, noon())
            .unwrap();

        let first_hour = out
            .lines()
            .skip_while(|l| !l.starts_with("Next 24 hours"))
            .nth(1)
            .unwrap();
        assert!(first_hour.trim_start().starts_with("12:00"), "{first_hour}");
    }

    #[test]
    fn extended_view_lists_ten_days() {
        let renderer = Renderer::new(Theme::Dark, false);
        let out = renderer
            .dashboard(&resolution(None), false, DailyView::Extended, noon())
            .unwrap();

        let rows = out
            .lines()
            .skip_while(|l| !l.starts_with("10-Day Forecast"))
            .skip(1)
            .count();
        assert_eq!(rows, 10);
    }

    #[test]
    fn notice_is_shown_under_header() {
        let renderer = Renderer::new(Theme::Light, false);
        let out = renderer
            .dashboard(&resolution(Some("Location access denied.")), false, DailyView::Week, noon())
            .unwrap();
        assert!(out.contains("⚠ Location access denied."));
    }

    #[test]
    fn cached_fallback_city_is_labelled() {
        let renderer = Renderer::new(Theme::Light, false);
        let mut fallback = resolution(None);
        fallback.source = LocationSource::Cache;
        fallback.location_denied = true;

        let out = renderer
            .dashboard(&fallback, false, DailyView::Week, noon())
            .unwrap();
        assert!(out.contains("Showing fallback city"));

        let out = renderer
            .dashboard(&resolution(None), false, DailyView::Week, noon())
            .unwrap();
        assert!(!out.contains("Showing fallback city"));
    }

    #[test]
    fn coloured_output_uses_escape_codes() {
        let renderer = Renderer::new(Theme::Dark, true);
        assert!(renderer.error("boom").contains('\u{1b}'));
        assert_eq!(Renderer::new(Theme::Dark, false).error("boom"), "✖ boom");
    }

    #[test]
    fn empty_favorites_message() {
        let out = Renderer::new(Theme::Light, false).favorites(&[]).unwrap();
        assert_eq!(out.trim(), "No favorite locations yet.");
    }
}
