use serde::{Deserialize, Serialize};

/// Air Quality Index as reported by the provider (1 = best, 5 = worst)
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct AirQualityIndex(pub i64);

impl AirQualityIndex {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            5 => "Very Poor",
            _ => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, "Good")]
    #[case(2, "Fair")]
    #[case(3, "Moderate")]
    #[case(4, "Poor")]
    #[case(5, "Very Poor")]
    #[case(0, "Unknown")]
    #[case(9, "Unknown")]
    #[case(-1, "Unknown")]
    fn test_aqi_labels(#[case] value: i64, #[case] expected: &str) {
        assert_eq!(AirQualityIndex(value).label(), expected);
    }
}
