//! Polling loop of the sensor node.
//!
//! The agent owns its hardware through the port traits below, so the same
//! state machine drives the ESP32 board and the host simulation.

use std::time::Duration;

use log::{info, warn};
use thiserror::Error;

use crate::{
    config::SensorConfig,
    display::DisplayFrame,
    retry::RetryPolicy,
    types::{round_tenths, DescribeRequest, DescribeResponse},
};

const ERROR_BODY_SNIPPET: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub temperature_c: f64,
    pub humidity: f64,
}

impl Sample {
    pub fn rounded(self) -> Self {
        Self {
            temperature_c: round_tenths(self.temperature_c),
            humidity: round_tenths(self.humidity),
        }
    }
}

pub trait Sensor {
    /// `None` when the sensor did not produce a usable reading.
    fn sample(&mut self) -> Option<Sample>;
}

pub trait GatewayLink {
    /// One POST of `request`. Any HTTP status is a successful exchange here;
    /// only transport problems are errors.
    fn post(&mut self, request: &DescribeRequest) -> Result<GatewayReply, SendError>;
}

pub trait Screen {
    fn show(&mut self, frame: &DisplayFrame);
}

pub trait Network {
    fn is_connected(&mut self) -> bool;

    /// Starts (or restarts) the connection attempt.
    fn connect(&mut self) -> Result<(), NetworkError>;

    fn address(&mut self) -> Option<String> {
        None
    }
}

pub trait Clock {
    fn now_ms(&self) -> u64;
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("network connect failed: {0}")]
pub struct NetworkError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Disconnected,
    Idle,
    Sampling,
    Sending,
    Displaying,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Reconnected,
    Waiting,
    SampleInvalid,
    Reported {
        sample: Sample,
        description_updated: bool,
    },
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    send_interval_ms: u64,
    loop_tick: Duration,
    reconnect_poll: Duration,
    reconnect_settle: Duration,
}

pub struct SensorAgent<S, L, D, N, C> {
    sensor: S,
    link: L,
    screen: D,
    network: N,
    clock: C,
    retry: RetryPolicy,
    timing: Timing,

    state: AgentState,
    last_send_ms: Option<u64>,
    last_sample: Option<Sample>,
    last_description: Option<String>,
}

impl<S, L, D, N, C> SensorAgent<S, L, D, N, C>
where
    S: Sensor,
    L: GatewayLink,
    D: Screen,
    N: Network,
    C: Clock,
{
    pub fn new(config: &SensorConfig, sensor: S, link: L, screen: D, network: N, clock: C) -> Self {
        Self {
            sensor,
            link,
            screen,
            network,
            clock,
            retry: config.retry_policy(),
            timing: Timing {
                send_interval_ms: config.send_interval_ms,
                loop_tick: Duration::from_millis(config.loop_tick_ms),
                reconnect_poll: Duration::from_millis(config.reconnect_poll_ms),
                reconnect_settle: Duration::from_millis(config.reconnect_settle_ms),
            },
            state: AgentState::Disconnected,
            last_send_ms: None,
            last_sample: None,
            last_description: None,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn last_sample(&self) -> Option<Sample> {
        self.last_sample
    }

    pub fn last_description(&self) -> Option<&str> {
        self.last_description.as_deref()
    }

    /// Boot screen, first connection, then the address on screen.
    pub fn start(&mut self) {
        self.screen.show(&DisplayFrame::message("Starting..."));
        self.connect_blocking();
        self.state = AgentState::Idle;

        let address = self.network.address();
        info!("IP: {}", address.as_deref().unwrap_or("unknown"));
        if let Some(address) = address {
            self.screen.show(&DisplayFrame::message(&address));
        }
    }

    pub fn run(&mut self) -> ! {
        self.start();
        loop {
            if self.step() != StepOutcome::Reconnected {
                self.clock.sleep(self.timing.loop_tick);
            }
        }
    }

    /// One loop iteration.
    pub fn step(&mut self) -> StepOutcome {
        if !self.network.is_connected() {
            self.reconnect();
            return StepOutcome::Reconnected;
        }

        let now_ms = self.clock.now_ms();
        if !self.send_due(now_ms) {
            self.state = AgentState::Idle;
            return StepOutcome::Waiting;
        }

        self.state = AgentState::Sampling;
        let Some(sample) = self.sensor.sample() else {
            warn!("sensor returned no reading");
            self.state = AgentState::Idle;
            return StepOutcome::SampleInvalid;
        };
        let sample = sample.rounded();
        info!(
            "Temp: {} °C  Humidity: {} %",
            sample.temperature_c, sample.humidity
        );
        self.last_sample = Some(sample);

        self.state = AgentState::Sending;
        let description_updated = match self.send_reading(sample) {
            Some(description) => {
                self.last_description = Some(description);
                true
            }
            None => false,
        };

        self.state = AgentState::Displaying;
        self.screen.show(&DisplayFrame::reading(
            sample.temperature_c,
            sample.humidity,
            self.last_description.as_deref(),
        ));

        self.last_send_ms = Some(now_ms);
        self.state = AgentState::Idle;
        StepOutcome::Reported {
            sample,
            description_updated,
        }
    }

    fn send_due(&self, now_ms: u64) -> bool {
        self.last_send_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.timing.send_interval_ms)
    }

    fn send_reading(&mut self, sample: Sample) -> Option<String> {
        let request = DescribeRequest::indoor(sample.temperature_c, sample.humidity);
        let link = &mut self.link;
        let clock = &mut self.clock;

        let result = self.retry.run(
            |delay| clock.sleep(delay),
            |_attempt| -> Result<String, SendError> {
                let reply = link.post(&request)?;
                if reply.status == 200 {
                    Ok(parse_description(&reply.body))
                } else {
                    Err(SendError::Status {
                        status: reply.status,
                        body: reply.body.chars().take(ERROR_BODY_SNIPPET).collect(),
                    })
                }
            },
        );

        match result {
            Ok(description) => {
                info!("---\n{description}\n---");
                Some(description)
            }
            Err(exhausted) => {
                warn!(
                    "gateway unreachable after {} attempts: {}",
                    exhausted.attempts, exhausted.last_error
                );
                None
            }
        }
    }

    fn reconnect(&mut self) {
        self.state = AgentState::Disconnected;
        warn!("network disconnected; reconnecting");
        self.connect_blocking();
        info!("network reconnected");

        self.last_send_ms = None;
        self.clock.sleep(self.timing.reconnect_settle);
        self.state = AgentState::Idle;
    }

    fn connect_blocking(&mut self) {
        while !self.network.is_connected() {
            match self.network.connect() {
                Ok(()) => {
                    while !self.network.is_connected() {
                        self.clock.sleep(self.timing.reconnect_poll);
                    }
                }
                Err(err) => {
                    warn!("{err}");
                    self.clock.sleep(self.timing.reconnect_poll);
                }
            }
        }
    }
}

/// The `description` field of a JSON reply, or the raw body when the reply is
/// not JSON or carries no such field.
pub fn parse_description(body: &str) -> String {
    match serde_json::from_str::<DescribeResponse>(body) {
        Ok(response) => response.description,
        Err(_) => body.to_string(),
    }
}
