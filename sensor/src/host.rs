use anyhow::Context;
use reqwest::blocking::Client;
use tracing::info;

use roomtalk_common::{
    DescribeRequest, DisplayFrame, GatewayLink, GatewayReply, Network, NetworkError, Sample,
    Screen, SendError, Sensor, SensorAgent, SensorConfig, SystemClock,
};

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SensorConfig::from_env();
    info!(
        "simulated sensor posting to {} every {}s",
        config.gateway_url,
        config.send_interval_ms / 1000
    );

    let link = HttpGatewayLink::new(&config)?;
    let mut agent = SensorAgent::new(
        &config,
        SimulatedSensor::default(),
        link,
        ConsoleScreen,
        LoopbackNetwork,
        SystemClock,
    );
    agent.run()
}

/// Slowly varying readings in place of the DHT11.
#[derive(Default)]
struct SimulatedSensor {
    tick: u64,
}

impl Sensor for SimulatedSensor {
    fn sample(&mut self) -> Option<Sample> {
        self.tick = self.tick.saturating_add(1);
        Some(Sample {
            temperature_c: 20.0 + (self.tick % 8) as f64 * 0.2,
            humidity: 42.0 + (self.tick % 6) as f64 * 0.5,
        })
    }
}

struct HttpGatewayLink {
    http: Client,
    url: String,
}

impl HttpGatewayLink {
    fn new(config: &SensorConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("failed to build gateway http client")?;
        Ok(Self {
            http,
            url: config.gateway_url.clone(),
        })
    }
}

impl GatewayLink for HttpGatewayLink {
    fn post(&mut self, request: &DescribeRequest) -> Result<GatewayReply, SendError> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .map_err(|err| SendError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| SendError::Transport(err.to_string()))?;
        Ok(GatewayReply { status, body })
    }
}

/// Prints each frame where the OLED would draw it.
struct ConsoleScreen;

impl Screen for ConsoleScreen {
    fn show(&mut self, frame: &DisplayFrame) {
        info!("[display]\n{}", frame.lines.join("\n"));
    }
}

struct LoopbackNetwork;

impl Network for LoopbackNetwork {
    fn is_connected(&mut self) -> bool {
        true
    }

    fn connect(&mut self) -> Result<(), NetworkError> {
        Ok(())
    }

    fn address(&mut self) -> Option<String> {
        Some("127.0.0.1".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_readings_stay_in_sensor_range() {
        let mut sensor = SimulatedSensor::default();
        for _ in 0..50 {
            let sample = sensor.sample().unwrap();
            assert!((20.0..=21.4).contains(&sample.temperature_c));
            assert!((42.0..=44.5).contains(&sample.humidity));
        }
    }

    #[test]
    fn unreachable_gateway_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = SensorConfig {
            gateway_url: format!("http://{addr}/describe"),
            ..SensorConfig::default()
        };
        let mut link = HttpGatewayLink::new(&config).unwrap();

        let err = link.post(&DescribeRequest::indoor(21.0, 40.0)).unwrap_err();
        assert!(matches!(err, SendError::Transport(_)), "{err:?}");
    }
}
