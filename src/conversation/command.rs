use super::state::Flow;

pub const WELCOME: &str = "Hello! Welcome to ZiWeatherBot. Use commands like /weather, /hourly, /4day, or /airquality to get weather information.";

/// A recognised bot command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/start` or `/help`
    Start,
    Flow(Flow),
}

impl Command {
    /// Parse the leading command token of a message. Tokens may carry a
    /// `@BotName` suffix as sent in group chats; with `bot_username` set, a
    /// suffix naming another bot is not ours. Unknown commands are `None`.
    #[must_use]
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        if addressed_elsewhere(text, bot_username) {
            return None;
        }
        let (name, _) = command_token(text)?;
        match name {
            "start" | "help" => Some(Command::Start),
            "weather" => Some(Command::Flow(Flow::CurrentWeather)),
            "hourly" => Some(Command::Flow(Flow::Hourly)),
            "4day" => Some(Command::Flow(Flow::FourDay)),
            "airquality" => Some(Command::Flow(Flow::AirQuality)),
            _ => None,
        }
    }
}

/// True when the message is a `/command@name` for a bot other than
/// `bot_username`. Always false when no username is configured.
#[must_use]
pub fn addressed_elsewhere(text: &str, bot_username: Option<&str>) -> bool {
    let Some(ours) = bot_username.map(|name| name.trim_start_matches('@')) else {
        return false;
    };
    matches!(
        command_token(text),
        Some((_, Some(target))) if !target.eq_ignore_ascii_case(ours)
    )
}

/// `/name@target rest` split into `name` and `target`
fn command_token(text: &str) -> Option<(&str, Option<&str>)> {
    let token = text.split_whitespace().next()?.strip_prefix('/')?;
    Some(match token.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (token, None),
    })
}

impl Flow {
    /// First message of the flow, asking for a location
    #[must_use]
    pub fn prompt(self) -> &'static str {
        match self {
            Flow::CurrentWeather => {
                "Please enter the location for which you want the current weather:"
            }
            Flow::Hourly => "Please enter the location for an hourly weather forecast:",
            Flow::FourDay => "Please enter the location for the 4-day weather outlook:",
            Flow::AirQuality => "Please enter the location for air quality information:",
        }
    }
}
