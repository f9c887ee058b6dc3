//! Conversation flow
//!
//! - Command routing: `/start`, `/weather`, `/hourly`, `/4day`, `/airquality`
//! - Per-chat pending steps
//! - The `WeatherBot` service that ties the resolver and the formatter together

pub mod command;
pub mod service;
pub mod state;

pub use command::Command;
pub use service::WeatherBot;
pub use state::{ConversationStep, ConversationTable, Flow};
