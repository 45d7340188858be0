use std::future::Future;

use anyhow::{bail, Context};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use roomtalk_common::{monotonic_ms, GatewayConfig, OutsideWeather, WeatherCache, WeatherLocation};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m";

pub trait WeatherSource: Send + Sync {
    /// Current outside conditions, `None` when there is nothing to offer.
    /// Failures are absorbed here and never reach the caller.
    fn fetch(
        &self,
        location: Option<WeatherLocation>,
    ) -> impl Future<Output = Option<OutsideWeather>> + Send;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: f64,
    #[serde(alias = "humidity_2m")]
    relative_humidity_2m: f64,
}

/// Open-Meteo client with a single-slot cache for the configured location.
pub struct OpenMeteoClient {
    http: Client,
    forecast_url: String,
    ttl_ms: u64,
    cache: Mutex<WeatherCache>,
}

impl OpenMeteoClient {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.weather_timeout())
            .build()
            .context("failed to build weather http client")?;

        Ok(Self {
            http,
            forecast_url: format!(
                "{}/v1/forecast",
                config.weather_base_url.trim_end_matches('/')
            ),
            ttl_ms: config.weather_cache_ttl_ms(),
            cache: Mutex::new(WeatherCache::new()),
        })
    }

    async fn request(&self, location: WeatherLocation) -> anyhow::Result<OutsideWeather> {
        let response = self
            .http
            .get(&self.forecast_url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
            ])
            .send()
            .await
            .context("weather request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("weather API returned HTTP {status}");
        }

        let body: ForecastResponse = response
            .json()
            .await
            .context("malformed weather response")?;
        Ok(OutsideWeather {
            temperature_c: body.current.temperature_2m,
            humidity: body.current.relative_humidity_2m,
        })
    }
}

impl WeatherSource for OpenMeteoClient {
    async fn fetch(&self, location: Option<WeatherLocation>) -> Option<OutsideWeather> {
        let location = location?;

        // Held across the request so concurrent callers share one fetch.
        let mut cache = self.cache.lock().await;
        if let Some(weather) = cache.get_if_fresh(self.ttl_ms, monotonic_ms()) {
            debug!("outside weather served from cache");
            return Some(weather);
        }

        match self.request(location).await {
            Ok(weather) => {
                cache.put(weather.temperature_c, weather.humidity, monotonic_ms());
                Some(weather)
            }
            Err(err) => {
                let fallback = cache.latest();
                match (fallback, cache.age_ms(monotonic_ms())) {
                    (Some(_), Some(age_ms)) => warn!(
                        "weather fetch failed: {err:#}; using cached value from {}s ago",
                        age_ms / 1000
                    ),
                    _ => warn!("weather fetch failed: {err:#}; no cached value"),
                }
                fallback
            }
        }
    }
}
