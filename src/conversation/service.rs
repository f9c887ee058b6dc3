use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::command::{self, Command, WELCOME};
use super::state::{ConversationStep, ConversationTable, Flow};
use crate::formatter::{self, AIR_QUALITY_FAILURE, FORECAST_FAILURE, WEATHER_FAILURE};
use crate::location_resolver::LocationResolver;
use crate::models::Coordinates;
use crate::telegram::{ChatId, Reply};
use crate::weather::WeatherProvider;
use crate::Result;

pub const LOCATION_NOT_FOUND: &str = "Location not found. Please try again with a valid location.";

/// The bot's conversation logic, built once at startup and shared by every
/// webhook request
pub struct WeatherBot {
    resolver: LocationResolver,
    weather: Arc<dyn WeatherProvider>,
    steps: ConversationTable,
    clock: fn() -> DateTime<Utc>,
    username: Option<String>,
}

impl WeatherBot {
    pub fn new(resolver: LocationResolver, weather: Arc<dyn WeatherProvider>) -> Self {
        Self {
            resolver,
            weather,
            steps: ConversationTable::new(),
            clock: Utc::now,
            username: None,
        }
    }

    /// The bot's own username, used to skip commands aimed at other bots
    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Replace the clock used to pick the hourly window
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn steps(&self) -> &ConversationTable {
        &self.steps
    }

    /// Dispatch one inbound message and return the replies for that chat.
    /// `text` is `None` for messages without text (stickers, photos, ...).
    #[instrument(skip(self, text))]
    pub async fn handle_message(&self, chat_id: ChatId, text: Option<&str>) -> Vec<Reply> {
        let username = self.username.as_deref();
        if text.is_some_and(|t| command::addressed_elsewhere(t, username)) {
            debug!("Command addressed to another bot, ignoring message");
            return Vec::new();
        }
        if let Some(command) = text.and_then(|t| Command::parse(t, username)) {
            return self.handle_command(chat_id, command);
        }

        let Some(step) = self.steps.take(chat_id) else {
            debug!("No pending step, ignoring message");
            return Vec::new();
        };

        self.continue_step(chat_id, step, text.unwrap_or_default())
            .await
    }

    fn handle_command(&self, chat_id: ChatId, command: Command) -> Vec<Reply> {
        match command {
            Command::Start => {
                self.steps.clear(chat_id);
                vec![Reply::plain(WELCOME)]
            }
            Command::Flow(flow) => {
                info!(%flow, "Flow started");
                self.steps.set(chat_id, ConversationStep::awaiting(flow));
                vec![Reply::plain(flow.prompt())]
            }
        }
    }

    async fn continue_step(&self, chat_id: ChatId, step: ConversationStep, text: &str) -> Vec<Reply> {
        let ConversationStep::AwaitingLocation { flow, attempts } = step;

        match self.resolver.resolve(text).await {
            Ok(Some(coordinates)) => {
                info!(%flow, %coordinates, "Location resolved");
                self.run_flow(flow, coordinates).await
            }
            Ok(None) => {
                let next = step.retried();
                warn!(%flow, attempts = attempts + 1, "Location not resolved, asking again");
                self.steps.set(chat_id, next);
                vec![Reply::plain(LOCATION_NOT_FOUND)]
            }
            Err(e) => {
                error!(%flow, "Geocoding failed: {}", e);
                vec![Reply::plain(failure_message(flow))]
            }
        }
    }

    /// Fetch and render `flow` for resolved coordinates. Provider errors are
    /// logged and turned into the flow's fixed failure text.
    pub async fn run_flow(&self, flow: Flow, coordinates: Coordinates) -> Vec<Reply> {
        match self.render_flow(flow, coordinates).await {
            Ok(replies) => replies,
            Err(e) => {
                error!(%flow, %coordinates, "Error fetching weather data: {}", e);
                vec![Reply::plain(failure_message(flow))]
            }
        }
    }

    async fn render_flow(&self, flow: Flow, coordinates: Coordinates) -> Result<Vec<Reply>> {
        match flow {
            Flow::CurrentWeather => {
                let series = self.weather.forecast(coordinates).await?;
                let entry = series.current()?;
                Ok(vec![
                    Reply::markdown(formatter::CURRENT_WEATHER_INTRO),
                    Reply::markdown(formatter::render_current(entry)),
                ])
            }
            Flow::Hourly => {
                let series = self.weather.forecast(coordinates).await?;
                let now = (self.clock)();
                Ok(vec![Reply::markdown(formatter::render_hourly(&series, now)?)])
            }
            Flow::FourDay => {
                let series = self.weather.forecast(coordinates).await?;
                Ok(vec![Reply::markdown(formatter::render_four_day(&series)?)])
            }
            Flow::AirQuality => {
                let aqi = self.weather.air_quality(coordinates).await?;
                Ok(vec![Reply::markdown(formatter::render_air_quality(aqi))])
            }
        }
    }
}

fn failure_message(flow: Flow) -> &'static str {
    match flow {
        Flow::CurrentWeather => WEATHER_FAILURE,
        Flow::Hourly | Flow::FourDay => FORECAST_FAILURE,
        Flow::AirQuality => AIR_QUALITY_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BotError;
    use crate::location_resolver::test_support::FakeGeocoder;
    use crate::models::forecast::test_support::{epoch, series};
    use crate::models::{AirQualityIndex, ForecastSeries};
    use async_trait::async_trait;
    use chrono::Duration;
    use rstest::rstest;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeWeather {
        series: ForecastSeries,
        aqi: i64,
        fail: bool,
        requested: Mutex<Vec<Coordinates>>,
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn forecast(&self, coordinates: Coordinates) -> Result<ForecastSeries> {
            self.requested.lock().unwrap().push(coordinates);
            if self.fail {
                return Err(BotError::upstream("OpenWeatherMap forecast returned 500"));
            }
            Ok(self.series.clone())
        }

        async fn air_quality(&self, coordinates: Coordinates) -> Result<AirQualityIndex> {
            self.requested.lock().unwrap().push(coordinates);
            if self.fail {
                return Err(BotError::upstream("OpenWeatherMap air_pollution returned 500"));
            }
            Ok(AirQualityIndex(self.aqi))
        }
    }

    fn thirteen_hours_in() -> DateTime<Utc> {
        epoch() + Duration::hours(13)
    }

    fn bot_with(weather: FakeWeather) -> (WeatherBot, Arc<FakeWeather>) {
        let geocoder = FakeGeocoder::default().with_place("London", 51.507_32, -0.127_65);
        let weather = Arc::new(weather);
        let bot = WeatherBot::new(LocationResolver::new(Arc::new(geocoder)), weather.clone())
            .with_clock(thirteen_hours_in);
        (bot, weather)
    }

    fn healthy() -> FakeWeather {
        FakeWeather {
            series: series(epoch(), 40),
            aqi: 3,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_sends_welcome_and_registers_nothing() {
        let (bot, _) = bot_with(healthy());
        let replies = bot.handle_message(1, Some("/start")).await;
        assert_eq!(replies, vec![Reply::plain(WELCOME)]);
        assert!(bot.steps().is_empty());
    }

    #[tokio::test]
    async fn test_start_clears_pending_step() {
        let (bot, _) = bot_with(healthy());
        bot.handle_message(1, Some("/hourly")).await;
        bot.handle_message(1, Some("/start")).await;
        assert!(bot.steps().get(1).is_none());
        assert!(bot.handle_message(1, Some("London")).await.is_empty());
    }

    #[tokio::test]
    async fn test_command_prompts_and_registers_flow() {
        let (bot, _) = bot_with(healthy());
        let replies = bot.handle_message(5, Some("/4day")).await;
        assert_eq!(replies, vec![Reply::plain(Flow::FourDay.prompt())]);
        assert_eq!(
            bot.steps().get(5),
            Some(ConversationStep::awaiting(Flow::FourDay))
        );
    }

    #[tokio::test]
    async fn test_new_command_overwrites_pending_step() {
        let (bot, _) = bot_with(healthy());
        bot.handle_message(5, Some("/hourly")).await;
        bot.handle_message(5, Some("/airquality")).await;

        let replies = bot.handle_message(5, Some("London")).await;
        assert_eq!(
            replies,
            vec![Reply::markdown("*Air Quality Index (AQI):* Moderate\n")]
        );
    }

    #[tokio::test]
    async fn test_text_without_pending_step_is_ignored() {
        let (bot, weather) = bot_with(healthy());
        assert!(bot.handle_message(9, Some("London")).await.is_empty());
        assert!(weather.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_location_reprompts_same_flow() {
        let (bot, weather) = bot_with(healthy());
        bot.handle_message(3, Some("/hourly")).await;

        for attempt in 1..=3 {
            let replies = bot.handle_message(3, Some("Atlantis")).await;
            assert_eq!(replies, vec![Reply::plain(LOCATION_NOT_FOUND)]);
            assert_eq!(
                bot.steps().get(3),
                Some(ConversationStep::AwaitingLocation {
                    flow: Flow::Hourly,
                    attempts: attempt
                })
            );
        }
        assert!(weather.requested.lock().unwrap().is_empty());

        let replies = bot.handle_message(3, Some("London")).await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].text.starts_with(formatter::HOURLY_HEADER));
        assert!(bot.steps().get(3).is_none());
    }

    #[tokio::test]
    async fn test_non_text_message_counts_as_unresolvable() {
        let (bot, _) = bot_with(healthy());
        bot.handle_message(3, Some("/weather")).await;
        let replies = bot.handle_message(3, None).await;
        assert_eq!(replies, vec![Reply::plain(LOCATION_NOT_FOUND)]);
        assert!(bot.steps().get(3).is_some());
    }

    #[tokio::test]
    async fn test_current_weather_flow() {
        let (bot, weather) = bot_with(healthy());
        bot.handle_message(1, Some("/weather")).await;
        let replies = bot.handle_message(1, Some("London")).await;

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], Reply::markdown(formatter::CURRENT_WEATHER_INTRO));
        assert!(replies[1].text.contains("*Weather:* Entry 0"));
        assert_eq!(
            *weather.requested.lock().unwrap(),
            vec![Coordinates::new(51.51, -0.13)]
        );
        assert!(bot.steps().is_empty());
    }

    #[tokio::test]
    async fn test_hourly_flow_uses_clock() {
        let (bot, _) = bot_with(healthy());
        bot.handle_message(1, Some("/hourly")).await;
        let replies = bot.handle_message(1, Some("London")).await;
        let text = &replies[0].text;
        assert_eq!(text.matches("Time: ").count(), 4);
        assert!(text.contains("Weather: Entry 5\n"));
        assert!(text.contains("Weather: Entry 8\n"));
        assert!(!text.contains("Weather: Entry 4\n"));
    }

    #[tokio::test]
    async fn test_current_weather_empty_series() {
        let (bot, _) = bot_with(FakeWeather::default());
        bot.handle_message(1, Some("/weather")).await;
        let replies = bot.handle_message(1, Some("London")).await;
        assert_eq!(replies, vec![Reply::plain(WEATHER_FAILURE)]);
    }

    #[tokio::test]
    async fn test_command_for_other_bot_keeps_pending_step() {
        let (bot, weather) = bot_with(healthy());
        let bot = bot.with_username(Some("ZiWeatherBot".into()));
        bot.handle_message(4, Some("/hourly@ZiWeatherBot")).await;

        assert!(bot.handle_message(4, Some("/start@OtherBot")).await.is_empty());
        assert!(bot.handle_message(4, Some("/weather@OtherBot London")).await.is_empty());
        assert_eq!(bot.steps().get(4), Some(ConversationStep::awaiting(Flow::Hourly)));
        assert!(weather.requested.lock().unwrap().is_empty());

        let replies = bot.handle_message(4, Some("London")).await;
        assert!(replies[0].text.starts_with(formatter::HOURLY_HEADER));
    }

    #[tokio::test]
    async fn test_current_weather_ignores_broken_later_entry() {
        let mut slots = series(epoch(), 40).entries;
        slots[1] = None;
        let (bot, _) = bot_with(FakeWeather {
            series: ForecastSeries::from_slots(slots),
            ..healthy()
        });
        bot.handle_message(1, Some("/weather")).await;
        let replies = bot.handle_message(1, Some("London")).await;
        assert_eq!(replies.len(), 2);
        assert!(replies[1].text.contains("*Weather:* Entry 0"));
    }

    #[tokio::test]
    async fn test_four_day_with_broken_day_sends_failure() {
        let mut slots = series(epoch(), 40).entries;
        slots[8] = None;
        let (bot, _) = bot_with(FakeWeather {
            series: ForecastSeries::from_slots(slots),
            ..healthy()
        });
        bot.handle_message(1, Some("/4day")).await;
        let replies = bot.handle_message(1, Some("London")).await;
        assert_eq!(replies, vec![Reply::plain(FORECAST_FAILURE)]);
    }

    #[rstest]
    #[case("/weather", WEATHER_FAILURE)]
    #[case("/hourly", FORECAST_FAILURE)]
    #[case("/4day", FORECAST_FAILURE)]
    #[case("/airquality", AIR_QUALITY_FAILURE)]
    #[tokio::test]
    async fn test_provider_error_sends_fixed_failure(
        #[case] command: &str,
        #[case] expected: &str,
    ) {
        let (bot, _) = bot_with(FakeWeather {
            fail: true,
            ..Default::default()
        });
        bot.handle_message(1, Some(command)).await;
        let replies = bot.handle_message(1, Some("London")).await;
        assert_eq!(replies, vec![Reply::plain(expected)]);
        // Provider detail stays in the logs
        assert!(!replies[0].text.contains("500"));
        assert!(bot.steps().get(1).is_none());
    }

    #[tokio::test]
    async fn test_geocoder_failure_abandons_flow() {
        let geocoder = FakeGeocoder {
            fail: true,
            ..Default::default()
        };
        let bot = WeatherBot::new(
            LocationResolver::new(Arc::new(geocoder)),
            Arc::new(healthy()),
        );
        bot.handle_message(1, Some("/airquality")).await;
        let replies = bot.handle_message(1, Some("London")).await;
        assert_eq!(replies, vec![Reply::plain(AIR_QUALITY_FAILURE)]);
        assert!(bot.steps().is_empty());
    }
}
