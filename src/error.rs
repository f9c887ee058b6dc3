//! Error types and handling for the weather bot

use thiserror::Error;

/// Main error type for the bot
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Network failure, timeout or non-success status from a data provider
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable { message: String },

    /// A successful response that is missing expected fields
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Chat transport errors
    #[error("Telegram error: {message}")]
    Telegram { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BotError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new upstream error
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }

    /// Create a new malformed-response error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a new chat transport error
    pub fn telegram<S: Into<String>>(message: S) -> Self {
        Self::Telegram {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BotError::malformed(err.to_string())
        } else {
            BotError::upstream(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::malformed(err.to_string())
    }
}
