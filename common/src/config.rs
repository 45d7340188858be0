use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_timeout_secs: u64,
    pub weather_base_url: String,
    pub weather_location: Option<WeatherLocation>,
    pub weather_timeout_secs: u64,
    pub weather_cache_secs: u64,
    pub http_port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://127.0.0.1:11434".to_string(),
            ollama_model: "mistral".to_string(),
            ollama_timeout_secs: 60,
            weather_base_url: "https://api.open-meteo.com".to_string(),
            weather_location: None,
            weather_timeout_secs: 5,
            weather_cache_secs: 300,
            http_port: 8000,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`, keeping the default for anything that is
    /// missing or fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let latitude = text("OPENMETEO_LAT").and_then(|value| value.trim().parse::<f64>().ok());
        let longitude = text("OPENMETEO_LON").and_then(|value| value.trim().parse::<f64>().ok());
        let weather_location = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(WeatherLocation {
                latitude,
                longitude,
            }),
            _ => None,
        };

        Self {
            ollama_base_url: text("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            ollama_model: text("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            ollama_timeout_secs: parse_or(&lookup, "OLLAMA_TIMEOUT_SECONDS", defaults.ollama_timeout_secs),
            weather_base_url: text("OPENMETEO_BASE_URL").unwrap_or(defaults.weather_base_url),
            weather_location,
            weather_timeout_secs: parse_or(&lookup, "WEATHER_TIMEOUT_SECONDS", defaults.weather_timeout_secs),
            weather_cache_secs: parse_or(&lookup, "OUTSIDE_TEMP_CACHE_SECONDS", defaults.weather_cache_secs),
            http_port: parse_or(&lookup, "GATEWAY_HTTP_PORT", defaults.http_port),
        }
    }

    pub fn ollama_timeout(&self) -> Duration {
        Duration::from_secs(self.ollama_timeout_secs)
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_secs)
    }

    pub fn weather_cache_ttl_ms(&self) -> u64 {
        self.weather_cache_secs.saturating_mul(1000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub gateway_url: String,
    pub dht_pin: i32,
    pub oled_sda_pin: i32,
    pub oled_scl_pin: i32,
    pub oled_i2c_addr: u8,
    pub send_interval_ms: u64,
    pub http_timeout_ms: u64,
    pub http_retries: u32,
    pub retry_backoff_ms: u64,
    pub loop_tick_ms: u64,
    pub reconnect_poll_ms: u64,
    pub reconnect_settle_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: option_env!("WIFI_SSID").unwrap_or("CHANGE_ME").to_string(),
            wifi_pass: option_env!("WIFI_PASS").unwrap_or("CHANGE_ME").to_string(),
            gateway_url: option_env!("GATEWAY_URL")
                .unwrap_or("http://192.168.1.100:8000/describe")
                .to_string(),
            dht_pin: 15,
            oled_sda_pin: 21,
            oled_scl_pin: 22,
            oled_i2c_addr: 0x3C,
            send_interval_ms: 30_000,
            http_timeout_ms: 15_000,
            http_retries: 2,
            retry_backoff_ms: 500,
            loop_tick_ms: 500,
            reconnect_poll_ms: 500,
            reconnect_settle_ms: 1_000,
        }
    }
}

impl SensorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            gateway_url: lookup("GATEWAY_URL")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.gateway_url.clone()),
            send_interval_ms: parse_or(&lookup, "SEND_INTERVAL_MS", defaults.send_interval_ms),
            http_timeout_ms: parse_or(&lookup, "HTTP_TIMEOUT_MS", defaults.http_timeout_ms),
            http_retries: parse_or(&lookup, "HTTP_RETRIES", defaults.http_retries),
            ..defaults
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.http_retries, Duration::from_millis(self.retry_backoff_ms))
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn gateway_defaults_without_environment() {
        let config = GatewayConfig::from_lookup(|_| None);
        assert_eq!(config.ollama_base_url, "http://127.0.0.1:11434");
        assert_eq!(config.ollama_model, "mistral");
        assert_eq!(config.weather_location, None);
        assert_eq!(config.weather_cache_ttl_ms(), 300_000);
        assert_eq!(config.weather_timeout(), Duration::from_secs(5));
        assert_eq!(config.ollama_timeout(), Duration::from_secs(60));
        assert_eq!(config.http_port, 8000);
    }

    #[test]
    fn gateway_location_requires_both_coordinates() {
        let config = GatewayConfig::from_lookup(lookup_from(&[("OPENMETEO_LAT", "52.52")]));
        assert_eq!(config.weather_location, None);

        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("OPENMETEO_LAT", "52.52"),
            ("OPENMETEO_LON", " "),
        ]));
        assert_eq!(config.weather_location, None);

        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("OPENMETEO_LAT", "52.52"),
            ("OPENMETEO_LON", "13.41"),
            ("OUTSIDE_TEMP_CACHE_SECONDS", "600"),
        ]));
        assert_eq!(
            config.weather_location,
            Some(WeatherLocation {
                latitude: 52.52,
                longitude: 13.41,
            })
        );
        assert_eq!(config.weather_cache_ttl_ms(), 600_000);
    }

    #[test]
    fn gateway_invalid_numbers_fall_back_to_defaults() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("OUTSIDE_TEMP_CACHE_SECONDS", "five"),
            ("GATEWAY_HTTP_PORT", "70000"),
        ]));
        assert_eq!(config.weather_cache_secs, 300);
        assert_eq!(config.http_port, 8000);
    }

    #[test]
    fn sensor_retry_policy_reflects_config() {
        let config = SensorConfig::from_lookup(lookup_from(&[("HTTP_RETRIES", "4")]));
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(config.send_interval_ms, 30_000);
        assert_eq!(config.http_timeout(), Duration::from_secs(15));
    }
}
