use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentMeasurement {
    pub temperature: f32,
    pub pressure: f32,
    pub humidity: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirQualityMeasurement {
    pub eco2: u16,
    pub tvoc: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirQualityBaseline {
    pub eco2: u16,
    pub tvoc: u16,
}

impl AirQualityBaseline {
    pub fn is_valid(&self) -> bool {
        self.eco2 > 0 && self.tvoc > 0
    }
}

/// Retained broker payload. Sensor fields are present only when the sensor
/// that produces them is enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingPayload {
    pub time: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eco2: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvoc: Option<u16>,
}

impl ReadingPayload {
    pub fn new(
        time: u32,
        environment: Option<&EnvironmentMeasurement>,
        air_quality: Option<&AirQualityMeasurement>,
    ) -> Self {
        Self {
            time,
            temperature: environment.map(|env| env.temperature),
            humidity: environment.map(|env| env.humidity),
            pressure: environment.map(|env| env.pressure),
            eco2: air_quality.map(|aq| aq.eco2),
            tvoc: air_quality.map(|aq| aq.tvoc),
        }
    }

    pub fn to_json(&self) -> String {
        // Only numbers and a fixed key set, serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
