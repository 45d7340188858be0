use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INDOOR_TEMP_RANGE_C: RangeInclusive<f64> = -40.0..=85.0;
pub const HUMIDITY_RANGE: RangeInclusive<f64> = 0.0..=100.0;
pub const OUTSIDE_TEMP_RANGE_C: RangeInclusive<f64> = -60.0..=60.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// A validated indoor reading, optionally carrying outside conditions.
///
/// Fields are private so every instance has passed range checks; build one
/// with [`SensorReading::new`] or from a [`DescribeRequest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    temperature_c: f64,
    humidity: f64,
    outside_temp_c: Option<f64>,
    outside_humidity: Option<f64>,
}

impl SensorReading {
    pub fn new(temperature_c: f64, humidity: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            temperature_c: check_range("temperature_c", temperature_c, &INDOOR_TEMP_RANGE_C)?,
            humidity: check_range("humidity", humidity, &HUMIDITY_RANGE)?,
            outside_temp_c: None,
            outside_humidity: None,
        })
    }

    pub fn with_outside_temp(mut self, temp_c: f64) -> Result<Self, ValidationError> {
        self.outside_temp_c = Some(check_range(
            "outside_temp_c",
            temp_c,
            &OUTSIDE_TEMP_RANGE_C,
        )?);
        Ok(self)
    }

    pub fn with_outside_humidity(mut self, humidity: f64) -> Result<Self, ValidationError> {
        self.outside_humidity = Some(check_range("outside_humidity", humidity, &HUMIDITY_RANGE)?);
        Ok(self)
    }

    /// Returns a copy populated with both outside fields.
    pub fn with_outside(self, outside: OutsideWeather) -> Result<Self, ValidationError> {
        self.with_outside_temp(outside.temperature_c)?
            .with_outside_humidity(outside.humidity)
    }

    pub fn temperature_c(&self) -> f64 {
        self.temperature_c
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn outside_temp_c(&self) -> Option<f64> {
        self.outside_temp_c
    }

    pub fn outside_humidity(&self) -> Option<f64> {
        self.outside_humidity
    }

    /// True when neither outside field was supplied.
    pub fn lacks_outside_data(&self) -> bool {
        self.outside_temp_c.is_none() && self.outside_humidity.is_none()
    }
}

impl TryFrom<DescribeRequest> for SensorReading {
    type Error = ValidationError;

    fn try_from(request: DescribeRequest) -> Result<Self, Self::Error> {
        let mut reading = SensorReading::new(request.temperature_c, request.humidity)?;
        if let Some(temp_c) = request.outside_temp_c {
            reading = reading.with_outside_temp(temp_c)?;
        }
        if let Some(humidity) = request.outside_humidity {
            reading = reading.with_outside_humidity(humidity)?;
        }
        Ok(reading)
    }
}

/// Current outside conditions as reported by the weather service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutsideWeather {
    pub temperature_c: f64,
    pub humidity: f64,
}

impl OutsideWeather {
    pub fn rounded(self) -> Self {
        Self {
            temperature_c: round_tenths(self.temperature_c),
            humidity: round_tenths(self.humidity),
        }
    }
}

/// Body of `POST /describe`, both as the sensor sends it and as the gateway
/// accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescribeRequest {
    pub temperature_c: f64,
    pub humidity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outside_temp_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outside_humidity: Option<f64>,
}

impl DescribeRequest {
    pub fn indoor(temperature_c: f64, humidity: f64) -> Self {
        Self {
            temperature_c,
            humidity,
            outside_temp_c: None,
            outside_humidity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeResponse {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn check_range(
    field: &'static str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> Result<f64, ValidationError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
