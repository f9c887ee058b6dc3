//! Message rendering for the four forecast flows
//!
//! Everything here is pure: the caller fetches the data and supplies the
//! clock, so the output is deterministic for a given series.

use chrono::{DateTime, Utc};

use crate::models::location::round_to;
use crate::models::{AirQualityIndex, ForecastEntry, ForecastSeries};
use crate::Result;

pub const WEATHER_FAILURE: &str = "Unable to fetch weather information. Please try again later.";
pub const FORECAST_FAILURE: &str = "Could not fetch weather data. Please try again later.";
pub const AIR_QUALITY_FAILURE: &str =
    "Unable to fetch air quality information. Please try again later.";

pub const CURRENT_WEATHER_INTRO: &str = "Here's the current weather:";
pub const HOURLY_HEADER: &str = "*12-Hour Weather Forecast:*\n";
pub const FOUR_DAY_HEADER: &str = "*4-Day Weather Forecast:*\n";

const CARDINALS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Compass label for a wind bearing in degrees
#[must_use]
pub fn wind_direction(degrees: f64) -> &'static str {
    let sector = (degrees.rem_euclid(360.0) / 45.0).round_ties_even() as i64;
    CARDINALS[sector.rem_euclid(8) as usize]
}

/// m/s to km/h, one decimal
#[must_use]
pub fn kmh(speed_ms: f64) -> f64 {
    round_to(speed_ms * 3.6, 1)
}

/// Upper-case the first character and lower-case the rest
#[must_use]
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Body of the current-weather reply
#[must_use]
pub fn render_current(entry: &ForecastEntry) -> String {
    format!(
        "🌦️ *Weather:* {}\n\
         🌡️ *Temperature:* {:.1}°C\n\
         💧 *Humidity:* {}%\n\
         🌬️ *Wind Speed:* {:.1} km/h\n\
         🧭 *Wind Direction:* {}\n",
        capitalize(&entry.description),
        entry.temperature,
        entry.humidity,
        kmh(entry.wind_speed_ms),
        wind_direction(entry.wind_direction_deg),
    )
}

/// 12-hour forecast: header plus up to 4 blocks starting at the first
/// entry not in the past relative to `now`. Fails only when one of those
/// entries could not be decoded.
pub fn render_hourly(series: &ForecastSeries, now: DateTime<Utc>) -> Result<String> {
    let mut message = String::from(HOURLY_HEADER);
    for entry in series.hourly_window(now)? {
        let label = format!("Time: {}", entry.timestamp.format("%H:%M %d-%m-%Y"));
        message.push_str(&render_block(&label, entry));
    }
    Ok(message)
}

/// 4-day outlook: one block per day, 24 hours apart
pub fn render_four_day(series: &ForecastSeries) -> Result<String> {
    let mut message = String::from(FOUR_DAY_HEADER);
    for entry in series.daily_outlook()? {
        let label = format!("Date: {}", entry.timestamp.format("%d-%m-%Y"));
        message.push_str(&render_block(&label, entry));
    }
    Ok(message)
}

#[must_use]
pub fn render_air_quality(aqi: AirQualityIndex) -> String {
    format!("*Air Quality Index (AQI):* {}\n", aqi.label())
}

fn render_block(label: &str, entry: &ForecastEntry) -> String {
    format!(
        "{label}\n\
         🌡️ Temperature: {:.1}°C\n\
         🌦️ Weather: {}\n\
         🌬️ Wind Speed: {:.1} km/h\n\
         🧭 Wind Direction: {}\n\n",
        entry.temperature,
        capitalize(&entry.description),
        kmh(entry.wind_speed_ms),
        wind_direction(entry.wind_direction_deg),
    )
}
