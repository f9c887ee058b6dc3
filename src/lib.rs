//! `ZiWeather` - a Telegram weather bot
//!
//! Users pick a flow with a command, type a location, and get back current
//! conditions, a 12-hour forecast, a 4-day outlook or the air quality index
//! for that place.

pub mod config;
pub mod conversation;
pub mod error;
pub mod formatter;
pub mod location_resolver;
pub mod models;
pub mod telegram;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use config::BotConfig;
pub use conversation::{Flow, WeatherBot};
pub use error::BotError;
pub use location_resolver::{Geocoder, LocationResolver, NominatimGeocoder};
pub use models::{AirQualityIndex, Coordinates, ForecastEntry, ForecastSeries};
pub use telegram::{Reply, TelegramClient};
pub use weather::{OpenWeatherClient, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, BotError>;
