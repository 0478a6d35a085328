//! Latest-temperature slot value and its API projection.
//!
//! The bridge keeps exactly one reading: last write wins, no history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single stored temperature reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// The reading value in degrees Celsius.
    pub temperature: f64,

    /// Wall-clock time the bridge received the reading.
    pub received_at: DateTime<Utc>,
}

impl TemperatureReading {
    /// Create a reading stamped with the current wall-clock time.
    pub fn now(temperature: f64) -> Self {
        Self {
            temperature,
            received_at: Utc::now(),
        }
    }
}

/// Response body for the latest-temperature query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureResponse {
    /// The most recent reading value.
    pub temperature: f64,

    /// Unit of the reading. Always `"Celsius"`.
    pub unit: String,
}

impl From<&TemperatureReading> for TemperatureResponse {
    fn from(reading: &TemperatureReading) -> Self {
        Self {
            temperature: reading.temperature,
            unit: String::from("Celsius"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_projects_value_and_unit() {
        let reading = TemperatureReading::now(27.0);
        let response = TemperatureResponse::from(&reading);
        assert!((response.temperature - 27.0).abs() < f64::EPSILON);
        assert_eq!(response.unit, "Celsius");
    }
}
