//! Location Resolution Module
//!
//! Turns the free text a user typed into rounded coordinates. A location the
//! geocoder cannot match is not an error: the resolver returns `None` and the
//! conversation asks again.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::BotConfig;
use crate::models::Coordinates;
use crate::{BotError, Result};

/// A single geocoding match, unrounded
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Free-text to coordinate lookup returning the single best match
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>>;
}

/// Service for resolving location inputs
#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Resolve free text into coordinates rounded to 2 decimal places.
    /// `Ok(None)` means the geocoder found nothing for this input.
    pub async fn resolve(&self, location_text: &str) -> Result<Option<Coordinates>> {
        let query = location_text.trim();
        if query.is_empty() {
            debug!("Empty location input");
            return Ok(None);
        }

        match self.geocoder.geocode(query).await? {
            Some(place) => {
                let coordinates = Coordinates::rounded(place.latitude, place.longitude);
                info!(
                    "Coordinates ({}) found for location '{}' ({})",
                    coordinates, query, place.name
                );
                Ok(Some(coordinates))
            }
            None => {
                warn!("Location not found for '{}'", query);
                Ok(None)
            }
        }
    }
}

/// Nominatim (OpenStreetMap) geocoding client
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

impl NominatimGeocoder {
    pub fn new(config: &BotConfig) -> Result<Self> {
        Self::with_base_url(
            config.geocoding.base_url.clone(),
            &config.geocoding.user_agent,
            config.http_timeout(),
        )
    }

    pub fn with_base_url(base_url: String, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| BotError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(query)
        );

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::upstream(format!("Nominatim returned {status}")));
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        let parse = |raw: &str, axis: &str| {
            raw.parse::<f64>()
                .map_err(|_| BotError::malformed(format!("Nominatim {axis} is not a number: {raw}")))
        };

        Ok(Some(GeocodedPlace {
            latitude: parse(&place.lat, "lat")?,
            longitude: parse(&place.lon, "lon")?,
            name: place.display_name,
        }))
    }
}
