//! Data models for the weather bot
//!
//! - Location: rounded geographic coordinates
//! - Forecast: timestamped observations decoded from the weather provider
//! - Air quality: the provider's 1-5 pollution index

pub mod air_quality;
pub mod forecast;
pub mod location;

pub use air_quality::AirQualityIndex;
pub use forecast::{ForecastEntry, ForecastSeries};
pub use location::Coordinates;
