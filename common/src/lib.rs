pub mod agent;
pub mod cache;
pub mod clock;
pub mod config;
pub mod display;
pub mod prompt;
pub mod retry;
pub mod types;

pub use agent::{
    parse_description, AgentState, Clock, GatewayLink, GatewayReply, Network, NetworkError,
    Sample, Screen, SendError, Sensor, SensorAgent, StepOutcome,
};
pub use cache::WeatherCache;
pub use clock::{monotonic_ms, SystemClock};
pub use config::{GatewayConfig, SensorConfig, WeatherLocation};
pub use display::{wrap_text, DisplayFrame};
pub use prompt::build_prompt;
pub use retry::{Backoff, RetryExhausted, RetryPolicy};
pub use types::{
    round_tenths, DescribeRequest, DescribeResponse, ErrorDetail, HealthStatus, OutsideWeather,
    SensorReading, ValidationError,
};
