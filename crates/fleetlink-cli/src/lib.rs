//! Fleetlink CLI - operator tooling for the fleetlink server.
//!
//! - fleetctl: inspect the fleet and send vehicle commands

pub mod client;
pub mod render;

pub use client::FleetClient;
