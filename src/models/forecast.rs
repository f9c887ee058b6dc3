//! Forecast series and the slices the bot renders from it
//!
//! The provider returns one entry every 3 hours, so 4 consecutive entries
//! cover 12 hours and every 8th entry lands 24 hours later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BotError, Result};

/// Number of entries shown by the 12-hour forecast
pub const HOURLY_WINDOW: usize = 4;
/// Step between entries of the 4-day outlook (8 x 3h = 24h)
pub const DAILY_STRIDE: usize = 8;
/// Entries considered by the 4-day outlook
pub const OUTLOOK_SPAN: usize = 32;

/// A single timestamped observation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastEntry {
    /// Timestamp for this observation
    pub timestamp: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: u8,
    /// Provider's description, e.g. "light rain"
    pub description: String,
    /// Wind speed in m/s
    pub wind_speed_ms: f64,
    /// Wind direction in degrees (0 is North)
    pub wind_direction_deg: f64,
}

/// Forecast entries in provider order. A slot is `None` when the provider
/// sent an entry that could not be decoded; such a slot only fails a flow
/// that actually renders it.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ForecastSeries {
    pub entries: Vec<Option<ForecastEntry>>,
}

impl ForecastSeries {
    #[must_use]
    pub fn new(entries: Vec<ForecastEntry>) -> Self {
        Self::from_slots(entries.into_iter().map(Some).collect())
    }

    #[must_use]
    pub fn from_slots(entries: Vec<Option<ForecastEntry>>) -> Self {
        Self { entries }
    }

    /// Nearest-time entry
    pub fn current(&self) -> Result<&ForecastEntry> {
        if self.entries.is_empty() {
            return Err(BotError::malformed("forecast list is empty"));
        }
        self.slot(0)
    }

    /// The first entry at or after `now` plus the following ones, up to
    /// [`HOURLY_WINDOW`] entries. Empty when every entry is in the past.
    pub fn hourly_window(&self, now: DateTime<Utc>) -> Result<Vec<&ForecastEntry>> {
        let start = self
            .entries
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|e| e.timestamp >= now));
        match start {
            Some(start) => {
                let end = (start + HOURLY_WINDOW).min(self.entries.len());
                (start..end).map(|i| self.slot(i)).collect()
            }
            None => Ok(Vec::new()),
        }
    }

    /// Entries at indices 0, 8, 16, 24 that exist
    pub fn daily_outlook(&self) -> Result<Vec<&ForecastEntry>> {
        (0..self.entries.len().min(OUTLOOK_SPAN))
            .step_by(DAILY_STRIDE)
            .map(|i| self.slot(i))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn slot(&self, index: usize) -> Result<&ForecastEntry> {
        self.entries
            .get(index)
            .and_then(Option::as_ref)
            .ok_or_else(|| BotError::malformed(format!("forecast entry {index} is malformed")))
    }
}
