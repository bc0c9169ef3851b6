//! Operator CLI for the fleetlink server.
//!
//! Inspects the fleet and sends vehicle commands. Command replies are the
//! gateway's own answer; a non-2xx reply exits non-zero.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

use fleetlink_cli::render::{render_fleet, render_modes, render_parameters, render_reply};
use fleetlink_cli::FleetClient;
use fleetlink_core::{parse_parameter_definitions, Vec3};
use fleetlink_gateway::GatewayResponse;

/// Control vehicles through a fleetlink server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Fleetlink server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show connected vehicles
    Status,
    /// Connect a vehicle (e.g. udp:127.0.0.1:14550 or /dev/ttyUSB0)
    Connect {
        address: String,
        /// Initial world position, north
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        /// Initial world position, east
        #[arg(long, default_value_t = 0.0)]
        y: f64,
        /// Initial world position, down
        #[arg(long, default_value_t = 0.0)]
        z: f64,
    },
    /// Disconnect a vehicle
    Disconnect { address: String },
    /// Arm a vehicle
    Arm { address: String },
    /// Land a vehicle
    Land { address: String },
    /// Take off to an altitude in meters
    Takeoff { address: String, altitude: f64 },
    /// List available flight modes
    Modes { address: String },
    /// Change flight mode
    Mode { address: String, name: String },
    /// List vehicle parameters
    Params {
        address: String,
        /// Parameter definition document (JSON) used to annotate values
        #[arg(long)]
        metadata: Option<PathBuf>,
    },
    /// Set a vehicle parameter
    SetParam {
        address: String,
        name: String,
        value: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = FleetClient::new(&args.url)?;

    match args.command {
        Command::Status => {
            let snapshot = client.fleet().await?;
            println!("{}", render_fleet(&snapshot));
        }
        Command::Connect { address, x, y, z } => {
            report(client.connect(&address, Vec3::new(x, y, z)).await?)?;
        }
        Command::Disconnect { address } => report(client.disconnect(&address).await?)?,
        Command::Arm { address } => report(client.arm(&address).await?)?,
        Command::Land { address } => report(client.land(&address).await?)?,
        Command::Takeoff { address, altitude } => {
            report(client.takeoff(&address, altitude).await?)?;
        }
        Command::Modes { address } => {
            let reply = client.modes(&address).await?;
            if !reply.is_success() {
                return report(reply);
            }
            println!("{}", render_modes(&reply.body));
        }
        Command::Mode { address, name } => report(client.set_mode(&address, &name).await?)?,
        Command::Params { address, metadata } => {
            let defs = match metadata {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let document = serde_json::from_str(&text)
                        .with_context(|| format!("Invalid parameter metadata in {}", path.display()))?;
                    parse_parameter_definitions(&document)
                }
                None => BTreeMap::new(),
            };
            let reply = client.parameters(&address).await?;
            if !reply.is_success() {
                return report(reply);
            }
            println!("{}", render_parameters(&reply.body, &defs));
        }
        Command::SetParam {
            address,
            name,
            value,
        } => report(client.set_parameter(&address, &name, value).await?)?,
    }

    Ok(())
}

fn report(reply: GatewayResponse) -> Result<()> {
    let line = render_reply(&reply);
    if reply.is_success() {
        println!("{line}");
        Ok(())
    } else {
        anyhow::bail!(line)
    }
}
