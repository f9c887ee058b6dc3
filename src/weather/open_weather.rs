//! Weather API client for OpenWeatherMap
//!
//! Two endpoints are used: `/forecast` for the 3-hourly series (metric units)
//! and `/air_pollution` for the current AQI. Responses are decoded into the
//! wire structures below and then converted into the crate's models.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::WeatherProvider;
use crate::config::BotConfig;
use crate::models::{AirQualityIndex, Coordinates, ForecastEntry, ForecastSeries};
use crate::{BotError, Result};

const SLOW_RESPONSE: Duration = Duration::from_secs(5);

/// HTTP client for the OpenWeatherMap 2.5 API
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    /// Create a client from the bot configuration
    pub fn new(config: &BotConfig) -> Result<Self> {
        Self::with_base_url(
            config.weather.base_url.clone(),
            config.weather.api_key.clone(),
            config.http_timeout(),
        )
    }

    /// Create a client against an explicit base URL
    pub fn with_base_url(base_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ziweather/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BotError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    #[instrument(skip(self))]
    pub async fn fetch_forecast(&self, coordinates: Coordinates) -> Result<ForecastSeries> {
        let url = format!(
            "{}/forecast?{}&units=metric&appid={}",
            self.base_url,
            coordinates.query(),
            self.api_key
        );
        let response: wire::ForecastResponse = self.get_json("forecast", &url).await?;
        let series = ForecastSeries::try_from(response)?;
        debug!("Decoded {} forecast entries", series.len());
        Ok(series)
    }

    #[instrument(skip(self))]
    pub async fn fetch_air_quality(&self, coordinates: Coordinates) -> Result<AirQualityIndex> {
        let url = format!(
            "{}/air_pollution?{}&appid={}",
            self.base_url,
            coordinates.query(),
            self.api_key
        );
        let response: wire::AirPollutionResponse = self.get_json("air_pollution", &url).await?;
        response
            .list
            .first()
            .map(|reading| AirQualityIndex(reading.main.aqi))
            .ok_or_else(|| BotError::malformed("air_pollution response has an empty list"))
    }

    /// GET `url` and decode the JSON body. `endpoint` is logged in place of
    /// the URL so the API key never reaches the logs.
    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, url: &str) -> Result<T> {
        let start_time = Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| {
            let e = e.without_url();
            error!("Request to {} failed: {}", endpoint, e);
            BotError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("OpenWeatherMap {} returned {}", endpoint, status);
            return Err(BotError::upstream(format!(
                "OpenWeatherMap {endpoint} returned {status}"
            )));
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|e| BotError::from(e.without_url()))?;

        let elapsed = start_time.elapsed();
        info!(
            "OpenWeatherMap {} answered in {:.3}s",
            endpoint,
            elapsed.as_secs_f64()
        );
        if elapsed > SLOW_RESPONSE {
            warn!("Slow API response detected: {:.3}s", elapsed.as_secs_f64());
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn forecast(&self, coordinates: Coordinates) -> Result<ForecastSeries> {
        self.fetch_forecast(coordinates).await
    }

    async fn air_quality(&self, coordinates: Coordinates) -> Result<AirQualityIndex> {
        self.fetch_air_quality(coordinates).await
    }
}

/// OpenWeatherMap response structures
mod wire {
    use serde::Deserialize;

    /// Items stay raw so one bad entry does not reject the whole list
    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub list: Vec<serde_json::Value>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastItem {
        /// Unix timestamp, UTC
        pub dt: i64,
        pub main: MainBlock,
        pub weather: Vec<Condition>,
        pub wind: Wind,
    }

    #[derive(Debug, Deserialize)]
    pub struct MainBlock {
        pub temp: f64,
        pub humidity: u8,
    }

    #[derive(Debug, Deserialize)]
    pub struct Condition {
        pub description: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Wind {
        pub speed: f64,
        pub deg: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct AirPollutionResponse {
        pub list: Vec<AirPollutionItem>,
    }

    #[derive(Debug, Deserialize)]
    pub struct AirPollutionItem {
        pub main: AqiBlock,
    }

    #[derive(Debug, Deserialize)]
    pub struct AqiBlock {
        pub aqi: i64,
    }
}

impl TryFrom<wire::ForecastItem> for ForecastEntry {
    type Error = BotError;

    fn try_from(item: wire::ForecastItem) -> Result<Self> {
        let timestamp = DateTime::from_timestamp(item.dt, 0)
            .ok_or_else(|| BotError::malformed(format!("timestamp out of range: {}", item.dt)))?;
        let description = item
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| BotError::malformed("forecast entry without weather condition"))?;

        Ok(ForecastEntry {
            timestamp,
            temperature: item.main.temp,
            humidity: item.main.humidity,
            description,
            wind_speed_ms: item.wind.speed,
            wind_direction_deg: item.wind.deg,
        })
    }
}

impl TryFrom<wire::ForecastResponse> for ForecastSeries {
    type Error = BotError;

    fn try_from(response: wire::ForecastResponse) -> Result<Self> {
        let slots = response
            .list
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let decoded = serde_json::from_value::<wire::ForecastItem>(raw)
                    .map_err(BotError::from)
                    .and_then(ForecastEntry::try_from);
                decoded
                    .inspect_err(|e| warn!(index, "Skipping forecast entry: {}", e))
                    .ok()
            })
            .collect();
        Ok(ForecastSeries::from_slots(slots))
    }
}
