//! Core data models for the fleet.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};
use uuid::Uuid;

use crate::error::TelemetryError;
use crate::trajectory::TrajectoryView;

/// Process-unique vehicle identity, minted at connect time and never reused.
pub type VehicleId = Uuid;

/// Flight modes that cannot be armed in.
pub const NON_ARMABLE_MODES: [&str; 10] = [
    "AUTOTUNE",
    "BRAKE",
    "CIRCLE",
    "FLIP",
    "FOLLOW",
    "LAND",
    "RTL",
    "SMARTRTL",
    "SYSID",
    "AVOIDADSB",
];

/// Whether a vehicle may be armed while in `mode`.
pub fn is_armable_mode(mode: &str) -> bool {
    !NON_ARMABLE_MODES
        .iter()
        .any(|blocked| blocked.eq_ignore_ascii_case(mode.trim()))
}

/// Cartesian triple used for local, world and display positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Vec3) -> f64 {
        let d = *self - *other;
        (d.x * d.x + d.y * d.y + d.z * d.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Convert from the vehicle's north-east-down frame to the right-handed,
    /// y-up display frame of the 3D map.
    pub fn ned_to_display(&self) -> Vec3 {
        Vec3 {
            x: self.y,
            y: -self.z,
            z: self.x,
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// VFR HUD group reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfrHud {
    pub airspeed: f64,
    pub groundspeed: f64,
    pub heading: f64,
    pub throttle: f64,
    pub altitude: f64,
    pub climb: f64,
}

/// Vehicle attitude in radians.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Latest known vehicle state, as returned by the gateway's `drone_info`.
///
/// `position` is mandatory; every other group falls back to its zero value
/// when the gateway omits it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    #[serde(default)]
    pub armed: bool,
    #[serde(default)]
    pub mode: String,
    /// Local position, north-east-down
    pub position: Vec3,
    #[serde(default)]
    pub waypoint_distance: f64,
    #[serde(default)]
    pub battery_level: f64,
    #[serde(default)]
    pub vfr: VfrHud,
    #[serde(default)]
    pub attitude: Attitude,
    /// Estimator health
    #[serde(default)]
    pub is_ekf_ok: bool,
}

impl Telemetry {
    /// Reject telemetry that would poison the world-position accumulator.
    pub fn validate(self) -> Result<Self, TelemetryError> {
        if !self.position.is_finite() {
            let Vec3 { x, y, z } = self.position;
            return Err(TelemetryError::NonFinitePosition { x, y, z });
        }
        Ok(self)
    }
}

/// One connected vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub connection_string: String,
    pub telemetry: Telemetry,
    /// Accumulated world position. Seeded once from the operator's
    /// offset and advanced by local-position deltas, never copied from
    /// `telemetry.position`.
    pub world_position: Vec3,
}

impl Vehicle {
    /// Create a freshly connected vehicle with zeroed telemetry.
    pub fn new(connection_string: impl Into<String>, initial_world_position: Vec3) -> Self {
        Self {
            id: Uuid::new_v4(),
            connection_string: connection_string.into(),
            telemetry: Telemetry::default(),
            world_position: initial_world_position,
        }
    }

    /// Integrate new telemetry: the local-position delta is added onto the
    /// world accumulator, then the telemetry replaces the previous value.
    /// Returns the applied delta.
    pub fn apply_telemetry(&mut self, telemetry: Telemetry) -> Vec3 {
        let delta = telemetry.position - self.telemetry.position;
        self.world_position += delta;
        self.telemetry = telemetry;
        delta
    }

    pub fn display_position(&self) -> Vec3 {
        self.world_position.ned_to_display()
    }
}

/// Read-only copy of a vehicle handed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleView {
    pub id: VehicleId,
    pub connection_string: String,
    pub telemetry: Telemetry,
    pub world_position: Vec3,
    pub display_position: Vec3,
    pub color: Option<String>,
    /// Whether the current flight mode allows arming.
    pub armable: bool,
}

impl VehicleView {
    pub fn from_vehicle(vehicle: &Vehicle, color: Option<&str>) -> Self {
        Self {
            id: vehicle.id,
            connection_string: vehicle.connection_string.clone(),
            telemetry: vehicle.telemetry.clone(),
            world_position: vehicle.world_position,
            display_position: vehicle.display_position(),
            color: color.map(str::to_string),
            armable: is_armable_mode(&vehicle.telemetry.mode),
        }
    }
}

/// Consistent view of the whole fleet: vehicles plus the trajectories of
/// vehicles that are still connected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub vehicles: Vec<VehicleView>,
    pub trajectories: Vec<TrajectoryView>,
}

impl FleetSnapshot {
    pub fn vehicle(&self, connection_string: &str) -> Option<&VehicleView> {
        self.vehicles
            .iter()
            .find(|v| v.connection_string == connection_string)
    }

    pub fn trajectory(&self, id: VehicleId) -> Option<&TrajectoryView> {
        self.trajectories.iter().find(|t| t.vehicle_id == id)
    }
}
