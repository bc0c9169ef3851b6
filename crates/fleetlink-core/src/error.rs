//! Error types for the core models.

use thiserror::Error;

/// A vehicle address that cannot travel through a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("vehicle address is empty")]
    Empty,
    /// The escape character would make the substitution ambiguous.
    #[error("vehicle address {0:?} contains the reserved character '+'")]
    ReservedCharacter(String),
}

/// Telemetry that parsed but cannot be fed into the position accumulator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    #[error("telemetry position is not finite: ({x}, {y}, {z})")]
    NonFinitePosition { x: f64, y: f64, z: f64 },
}
