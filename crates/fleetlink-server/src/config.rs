//! Server configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub gateway_url: String,
    pub gateway_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub trajectory_max_samples: usize,
    pub trajectory_min_distance: f64,
    pub discard_stale_polls: bool,
    pub stream_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            gateway_url: "http://localhost:8000".to_string(),
            gateway_timeout_ms: 2000,
            poll_interval_ms: 300,
            trajectory_max_samples: 100,
            trajectory_min_distance: 0.05,
            discard_stale_polls: true,
            stream_interval_ms: 500,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var::<u16>("FLEETLINK_PORT").unwrap_or(defaults.server_port),
            gateway_url: env::var("FLEETLINK_GATEWAY_URL").unwrap_or(defaults.gateway_url),
            gateway_timeout_ms: parse_var::<u64>("FLEETLINK_GATEWAY_TIMEOUT_MS")
                .unwrap_or(defaults.gateway_timeout_ms),
            poll_interval_ms: parse_var::<u64>("FLEETLINK_POLL_INTERVAL_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.poll_interval_ms),
            trajectory_max_samples: parse_var::<usize>("FLEETLINK_TRAJECTORY_MAX_SAMPLES")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.trajectory_max_samples),
            trajectory_min_distance: parse_var::<f64>("FLEETLINK_TRAJECTORY_MIN_DISTANCE")
                .filter(|d| d.is_finite() && *d >= 0.0)
                .unwrap_or(defaults.trajectory_min_distance),
            discard_stale_polls: parse_var::<bool>("FLEETLINK_DISCARD_STALE_POLLS")
                .unwrap_or(defaults.discard_stale_polls),
            stream_interval_ms: parse_var::<u64>("FLEETLINK_STREAM_INTERVAL_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.stream_interval_ms),
        }
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
