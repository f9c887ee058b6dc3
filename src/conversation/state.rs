//! Per-chat conversation state
//!
//! Each chat has at most one pending step. A new command replaces it, a
//! failed location lookup puts it back with the attempt count bumped, and a
//! finished flow removes it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::telegram::ChatId;

/// One of the four supported conversations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    CurrentWeather,
    Hourly,
    FourDay,
    AirQuality,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flow::CurrentWeather => "weather",
            Flow::Hourly => "hourly",
            Flow::FourDay => "4day",
            Flow::AirQuality => "airquality",
        };
        f.write_str(name)
    }
}

/// What the next free-text message from a chat will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationStep {
    /// `attempts` counts locations that already failed to resolve
    AwaitingLocation { flow: Flow, attempts: u32 },
}

impl ConversationStep {
    #[must_use]
    pub fn awaiting(flow: Flow) -> Self {
        ConversationStep::AwaitingLocation { flow, attempts: 0 }
    }

    #[must_use]
    pub fn flow(&self) -> Flow {
        match self {
            ConversationStep::AwaitingLocation { flow, .. } => *flow,
        }
    }

    /// Same flow, one more failed attempt
    #[must_use]
    pub fn retried(self) -> Self {
        match self {
            ConversationStep::AwaitingLocation { flow, attempts } => {
                ConversationStep::AwaitingLocation {
                    flow,
                    attempts: attempts.saturating_add(1),
                }
            }
        }
    }
}

/// In-memory table of pending steps keyed by chat
#[derive(Debug, Default)]
pub struct ConversationTable {
    steps: Mutex<HashMap<ChatId, ConversationStep>>,
}

impl ConversationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `step` for `chat_id`, replacing whatever was pending
    pub fn set(&self, chat_id: ChatId, step: ConversationStep) {
        self.lock().insert(chat_id, step);
    }

    /// Remove and return the pending step
    pub fn take(&self, chat_id: ChatId) -> Option<ConversationStep> {
        self.lock().remove(&chat_id)
    }

    #[must_use]
    pub fn get(&self, chat_id: ChatId) -> Option<ConversationStep> {
        self.lock().get(&chat_id).copied()
    }

    pub fn clear(&self, chat_id: ChatId) {
        self.lock().remove(&chat_id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<ChatId, ConversationStep>> {
        self.steps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
