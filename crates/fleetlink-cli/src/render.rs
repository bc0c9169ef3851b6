//! Plain-text rendering for terminal output.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

use fleetlink_core::params::{
    dropdown_display_value, has_dropdown_values, parameter_description, parameter_range,
    parameter_unit,
};
use fleetlink_core::{FleetSnapshot, ParamDefinition};
use fleetlink_gateway::{parse_modes, GatewayResponse};

/// One line per vehicle, in connect order.
pub fn render_fleet(snapshot: &FleetSnapshot) -> String {
    if snapshot.vehicles.is_empty() {
        return "No vehicles connected".to_string();
    }

    let mut out = String::new();
    for vehicle in &snapshot.vehicles {
        let t = &vehicle.telemetry;
        let p = vehicle.world_position;
        let samples = snapshot
            .trajectory(vehicle.id)
            .map_or(0, |trajectory| trajectory.points.len());
        let _ = writeln!(
            out,
            "{:<24} {:<10} {:<8} {:>5.1}%  world ({:.2}, {:.2}, {:.2})  trail {}{}",
            vehicle.connection_string,
            if t.mode.is_empty() { "-" } else { t.mode.as_str() },
            if t.armed { "ARMED" } else { "disarmed" },
            t.battery_level,
            p.x,
            p.y,
            p.z,
            samples,
            if vehicle.armable { "" } else { "  [not armable]" },
        );
    }
    out.trim_end().to_string()
}

/// One-line summary of a command reply.
pub fn render_reply(reply: &GatewayResponse) -> String {
    let outcome = if reply.is_success() {
        "OK"
    } else if reply.is_ack_timeout() {
        "TIMEOUT"
    } else {
        "FAILED"
    };
    match reply.message() {
        Some(message) => format!("{outcome} ({}): {message}", reply.status),
        None => format!("{outcome} ({})", reply.status),
    }
}

pub fn render_modes(body: &Value) -> String {
    let modes = parse_modes(body);
    if modes.is_empty() {
        "No modes reported".to_string()
    } else {
        modes.join("\n")
    }
}

/// Parameter listing, annotated from definitions when they are available.
pub fn render_parameters(body: &Value, defs: &BTreeMap<String, ParamDefinition>) -> String {
    let Some(params) = body.as_object() else {
        return "No parameters reported".to_string();
    };

    let mut names: Vec<&String> = params.keys().collect();
    names.sort();

    let mut out = String::new();
    for name in names {
        let raw = match &params[name.as_str()] {
            Value::Number(n) => match n.as_f64() {
                Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
                _ => n.to_string(),
            },
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let value = if has_dropdown_values(name, defs) {
            dropdown_display_value(name, &raw, defs)
        } else {
            format!("{raw} {}", parameter_unit(name, defs)).trim_end().to_string()
        };

        let _ = write!(out, "{name:<20} = {value}");
        if let Some((low, high)) = parameter_range(name, defs) {
            let _ = write!(out, "  [{low} .. {high}]");
        }
        if defs.contains_key(name.as_str()) {
            let _ = write!(out, "  # {}", parameter_description(name, defs));
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}
