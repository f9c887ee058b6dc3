use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ziweather::config::{BotConfig, LoggingConfig};
use ziweather::web::{self, AppState};
use ziweather::{LocationResolver, NominatimGeocoder, OpenWeatherClient, TelegramClient, WeatherBot};

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ziweather={0},tower_http={0}", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = BotConfig::from_env().context("Failed to load configuration")?;
    init_logging(&config.logging);

    let geocoder = NominatimGeocoder::new(&config).context("Failed to build geocoder")?;
    let weather = OpenWeatherClient::new(&config).context("Failed to build weather client")?;
    let telegram = TelegramClient::new(&config).context("Failed to build Telegram client")?;

    let bot = WeatherBot::new(LocationResolver::new(Arc::new(geocoder)), Arc::new(weather))
        .with_username(config.telegram.username.clone());
    let state = Arc::new(AppState::new(bot, telegram, config.webhook_target()));

    tracing::info!(version = ziweather::VERSION, "Starting ZiWeatherBot");
    web::run(state, config.server.port)
        .await
        .context("Webhook listener stopped")?;

    Ok(())
}
