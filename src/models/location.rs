//! Location model for geographic coordinates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Latitude/longitude pair handed from the resolver to the forecast flows
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    /// Create coordinates as given
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create coordinates rounded to 2 decimal places
    #[must_use]
    pub fn rounded(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: round_to(latitude, 2),
            longitude: round_to(longitude, 2),
        }
    }

    /// Query-string form used by the weather provider
    #[must_use]
    pub fn query(&self) -> String {
        format!("lat={:.2}&lon={:.2}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}, {:.2}", self.latitude, self.longitude)
    }
}

/// Round half away from zero to `places` decimals
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let multiplier = 10_f64.powi(places);
    (value * multiplier).round() / multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_coordinates() {
        let coords = Coordinates::rounded(46.818_234, 8.227_456);
        assert_eq!(coords.latitude, 46.82);
        assert_eq!(coords.longitude, 8.23);
    }

    #[test]
    fn test_rounded_negative_coordinates() {
        let coords = Coordinates::rounded(-33.868_82, -151.209_29);
        assert_eq!(coords.latitude, -33.87);
        assert_eq!(coords.longitude, -151.21);
    }

    #[test]
    fn test_query_and_display() {
        let coords = Coordinates::rounded(51.5074, -0.1278);
        assert_eq!(coords.query(), "lat=51.51&lon=-0.13");
        assert_eq!(coords.to_string(), "51.51, -0.13");
    }

    #[test]
    fn test_round_to_one_place() {
        assert_eq!(round_to(3.6 * 4.1, 1), 14.8);
        assert_eq!(round_to(21.04, 1), 21.0);
    }
}
