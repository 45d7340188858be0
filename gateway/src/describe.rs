use axum::http::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

use roomtalk_common::{build_prompt, SensorReading, WeatherLocation};

use crate::{
    inference::{InferenceError, TextGenerator},
    weather::WeatherSource,
};

#[derive(Debug, Error)]
pub enum DescribeError {
    #[error("Ollama error: {0}")]
    Upstream(String),
    #[error("Ollama unavailable: {0}")]
    Unavailable(String),
}

impl DescribeError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_GATEWAY
    }
}

impl From<InferenceError> for DescribeError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::UpstreamStatus { body, .. } => Self::Upstream(body),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Turns a validated reading into a one-sentence description.
pub struct Describer<W, G> {
    weather: W,
    generator: G,
    location: Option<WeatherLocation>,
}

impl<W: WeatherSource, G: TextGenerator> Describer<W, G> {
    pub fn new(weather: W, generator: G, location: Option<WeatherLocation>) -> Self {
        Self {
            weather,
            generator,
            location,
        }
    }

    pub async fn describe(&self, reading: SensorReading) -> Result<String, DescribeError> {
        let reading = self.enrich(reading).await;
        let prompt = build_prompt(&reading);
        match self.generator.generate(&prompt).await {
            Ok(text) => Ok(text),
            Err(err) => {
                warn!("inference failed: {err}");
                Err(err.into())
            }
        }
    }

    async fn enrich(&self, reading: SensorReading) -> SensorReading {
        if !reading.lacks_outside_data() || self.location.is_none() {
            return reading;
        }
        let Some(outside) = self.weather.fetch(self.location).await else {
            return reading;
        };

        let outside = outside.rounded();
        match reading.with_outside(outside) {
            Ok(enriched) => {
                info!(
                    "enriched reading with outside weather: {}°C, {}%",
                    outside.temperature_c, outside.humidity
                );
                enriched
            }
            Err(err) => {
                warn!("ignoring outside weather: {err}");
                reading
            }
        }
    }
}
