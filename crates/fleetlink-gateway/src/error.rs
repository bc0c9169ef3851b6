use fleetlink_core::{AddressError, TelemetryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid vehicle address: {0}")]
    Address(#[from] AddressError),
    /// Network failure or timeout; the request may not have reached the gateway.
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("vehicle is not known to the gateway")]
    NotFound,
    #[error("gateway returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Malformed(err.to_string())
    }
}

impl From<TelemetryError> for GatewayError {
    fn from(err: TelemetryError) -> Self {
        GatewayError::Malformed(err.to_string())
    }
}
