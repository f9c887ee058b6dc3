use async_trait::async_trait;

use crate::Result;
use crate::models::{AirQualityIndex, Coordinates, ForecastSeries};

pub mod open_weather;

pub use open_weather::OpenWeatherClient;

/// Source of forecast and air-quality readings for a coordinate pair
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// 3-hourly forecast series, nearest time first
    async fn forecast(&self, coordinates: Coordinates) -> Result<ForecastSeries>;

    /// Current air pollution reading
    async fn air_quality(&self, coordinates: Coordinates) -> Result<AirQualityIndex>;
}
