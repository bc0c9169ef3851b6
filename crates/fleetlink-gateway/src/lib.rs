//! Fleetlink gateway - vehicle gateway API client
//!
//! Handles all communication with the backend that owns the vehicle links.
//! The fleet engine is written against the [`Gateway`] trait; [`GatewayClient`]
//! is the HTTP implementation.

pub mod client;
pub mod error;
pub mod response;

pub use client::GatewayClient;
pub use error::GatewayError;
pub use response::{parse_modes, GatewayResponse, ALREADY_CONNECTED};

use async_trait::async_trait;
use fleetlink_core::Telemetry;

/// Request/response contract of the vehicle gateway.
///
/// Every call is keyed by the vehicle's connection string. Command calls
/// return the raw response for the caller to interpret; only transport-level
/// failures are errors.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn connect(&self, address: &str) -> Result<GatewayResponse, GatewayError>;

    async fn disconnect(&self, address: &str) -> Result<GatewayResponse, GatewayError>;

    /// Current telemetry. A vehicle the gateway no longer knows about is
    /// reported as [`GatewayError::NotFound`].
    async fn telemetry(&self, address: &str) -> Result<Telemetry, GatewayError>;

    async fn arm(&self, address: &str) -> Result<GatewayResponse, GatewayError>;

    async fn land(&self, address: &str) -> Result<GatewayResponse, GatewayError>;

    async fn takeoff(&self, address: &str, altitude: f64) -> Result<GatewayResponse, GatewayError>;

    async fn modes(&self, address: &str) -> Result<GatewayResponse, GatewayError>;

    async fn set_mode(&self, address: &str, mode: &str) -> Result<GatewayResponse, GatewayError>;

    async fn parameters(&self, address: &str) -> Result<GatewayResponse, GatewayError>;

    async fn set_parameter(
        &self,
        address: &str,
        name: &str,
        value: f64,
    ) -> Result<GatewayResponse, GatewayError>;
}
