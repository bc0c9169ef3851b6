//! Fleetlink core - vehicle, telemetry and trajectory models.
//!
//! Everything in this crate is pure data and arithmetic; the gateway client
//! and the fleet engine build on top of it.

pub mod address;
pub mod error;
pub mod models;
pub mod params;
pub mod trajectory;

pub use address::{escape_address, unescape_address};
pub use error::{AddressError, TelemetryError};
pub use models::{
    is_armable_mode, Attitude, FleetSnapshot, Telemetry, Vec3, Vehicle, VehicleId, VehicleView,
    VfrHud, NON_ARMABLE_MODES,
};
pub use params::{parse_parameter_definitions, ParamDefinition};
pub use trajectory::{TrajectoryTracker, TrajectoryView, DRONE_COLORS};
