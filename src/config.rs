//! Configuration management for the weather bot
//!
//! All settings come from environment variables, read through the `config`
//! crate. Required values are the bot token, the weather API key and the
//! public webhook base URL; the rest fall back to defaults.

use crate::BotError;
use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure for the bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API settings
    pub telegram: TelegramConfig,
    /// Weather API settings
    pub weather: WeatherConfig,
    /// Geocoding API settings
    pub geocoding: GeocodingConfig,
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Telegram Bot API configuration
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token, also used as the secret webhook path
    pub token: String,
    /// Base URL for the Bot API
    pub api_base_url: String,
    /// The bot's own username. When set, `/cmd@OtherBot` is left alone.
    pub username: Option<String>,
}

/// Weather API configuration settings
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: String,
    /// Base URL for weather API
    pub base_url: String,
    /// Request timeout in seconds, applied to every upstream call
    pub timeout_seconds: u32,
}

/// Geocoding configuration settings
#[derive(Debug, Clone)]
pub struct GeocodingConfig {
    pub base_url: String,
    /// Nominatim rejects requests without an identifying agent
    pub user_agent: String,
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Public base URL the bot token is appended to when registering the webhook
    pub webhook_url: String,
}

/// Logging configuration settings
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// Flat view of the environment. `config` lower-cases variable names, so
/// `BOT_TOKEN` lands in `bot_token`.
#[derive(Debug, Deserialize)]
struct EnvSettings {
    #[serde(default)]
    bot_token: Option<String>,
    #[serde(default)]
    weather_token: Option<String>,
    #[serde(default)]
    webhook_url: Option<String>,
    #[serde(default)]
    bot_username: Option<String>,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_timeout")]
    http_timeout_seconds: u32,
    #[serde(default = "default_telegram_base_url")]
    telegram_api_base_url: String,
    #[serde(default = "default_weather_base_url")]
    weather_api_base_url: String,
    #[serde(default = "default_geocoder_base_url")]
    geocoder_base_url: String,
    #[serde(default = "default_user_agent")]
    geocoder_user_agent: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_log_format")]
    log_format: String,
}

impl TryFrom<EnvSettings> for BotConfig {
    type Error = anyhow::Error;

    fn try_from(env: EnvSettings) -> Result<Self> {
        fn required(value: Option<String>, key: &str) -> Result<String> {
            value
                .ok_or_else(|| BotError::config(format!("Missing {key} env var")))
                .with_context(|| format!("Failed to load required setting {key}"))
        }

        Ok(Self {
            telegram: TelegramConfig {
                token: required(env.bot_token, "BOT_TOKEN")?,
                api_base_url: env.telegram_api_base_url,
                username: env.bot_username,
            },
            weather: WeatherConfig {
                api_key: required(env.weather_token, "WEATHER_TOKEN")?,
                base_url: env.weather_api_base_url,
                timeout_seconds: env.http_timeout_seconds,
            },
            geocoding: GeocodingConfig {
                base_url: env.geocoder_base_url,
                user_agent: env.geocoder_user_agent,
            },
            server: ServerConfig {
                port: env.port,
                webhook_url: required(env.webhook_url, "WEBHOOK_URL")?,
            },
            logging: LoggingConfig {
                level: env.log_level,
                format: env.log_format,
            },
        })
    }
}

// Default value functions
fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_geocoder_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    "weather_bot".to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl BotConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::load(Environment::default())
    }

    /// Load configuration from an explicit set of variables instead of the
    /// process environment
    pub fn from_map(vars: HashMap<String, String>) -> Result<Self> {
        Self::load(Environment::default().source(Some(vars)))
    }

    fn load(environment: Environment) -> Result<Self> {
        let settings = Config::builder()
            .add_source(environment)
            .build()
            .with_context(|| "Failed to build configuration")?;

        let env: EnvSettings = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        let mut config = Self::try_from(env)?;

        // Empty variables count as unset
        config.apply_defaults();

        config.validate()?;

        Ok(config)
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.telegram.api_base_url.is_empty() {
            self.telegram.api_base_url = default_telegram_base_url();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_timeout();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoder_base_url();
        }
        if self.geocoding.user_agent.is_empty() {
            self.geocoding.user_agent = default_user_agent();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self
            .telegram
            .username
            .as_ref()
            .is_some_and(|name| name.trim().is_empty())
        {
            self.telegram.username = None;
        }
        for url in [
            &mut self.telegram.api_base_url,
            &mut self.weather.base_url,
            &mut self.geocoding.base_url,
        ] {
            while url.ends_with('/') {
                url.pop();
            }
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_credentials()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Timeout shared by every upstream HTTP client
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.weather.timeout_seconds.into())
    }

    /// Full URL handed to Telegram when registering the webhook
    #[must_use]
    pub fn webhook_target(&self) -> String {
        format!("{}{}", self.server.webhook_url, self.telegram.token)
    }

    fn validate_credentials(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            return Err(BotError::config("BOT_TOKEN cannot be empty").into());
        }

        if self.telegram.token.contains('/') {
            return Err(BotError::config("BOT_TOKEN cannot contain '/'").into());
        }

        if self.weather.api_key.trim().is_empty() {
            return Err(BotError::config("WEATHER_TOKEN cannot be empty").into());
        }

        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 120 {
            return Err(
                BotError::config("HTTP timeout cannot exceed 120 seconds").into(),
            );
        }

        if self.server.port == 0 {
            return Err(BotError::config("PORT cannot be 0").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(BotError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(BotError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("TELEGRAM_API_BASE_URL", &self.telegram.api_base_url),
            ("WEATHER_API_BASE_URL", &self.weather.base_url),
            ("GEOCODER_BASE_URL", &self.geocoding.base_url),
            ("WEBHOOK_URL", &self.server.webhook_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(BotError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if !self.server.webhook_url.ends_with('/') {
            return Err(BotError::config("WEBHOOK_URL must end with '/'").into());
        }

        Ok(())
    }
}
