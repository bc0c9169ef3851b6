//! Scripted in-memory gateway for engine tests.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use fleetlink_core::{Telemetry, Vec3};
use fleetlink_gateway::{Gateway, GatewayError, GatewayResponse};

#[derive(Debug, Clone)]
enum TelemetryScript {
    Report(Telemetry),
    Lost,
    Failing,
}

#[derive(Default)]
pub struct ScriptedGateway {
    connect: Mutex<HashMap<String, GatewayResponse>>,
    disconnect: Mutex<HashMap<String, GatewayResponse>>,
    commands_by_name: Mutex<HashMap<String, GatewayResponse>>,
    telemetry: Mutex<HashMap<String, TelemetryScript>>,
    delays: Mutex<HashMap<String, Duration>>,
    log: Mutex<Vec<String>>,
    telemetry_calls: AtomicUsize,
    unreachable: AtomicBool,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connect_response(&self, address: &str, response: GatewayResponse) {
        self.connect.lock().unwrap().insert(address.into(), response);
    }

    pub fn set_disconnect_response(&self, address: &str, response: GatewayResponse) {
        self.disconnect.lock().unwrap().insert(address.into(), response);
    }

    /// Response for every call of a command (`arm`, `takeoff`, ...).
    pub fn set_command_response(&self, command: &str, response: GatewayResponse) {
        self.commands_by_name
            .lock()
            .unwrap()
            .insert(command.into(), response);
    }

    pub fn set_position(&self, address: &str, position: Vec3) {
        let telemetry = Telemetry {
            position,
            ..Telemetry::default()
        };
        self.telemetry
            .lock()
            .unwrap()
            .insert(address.into(), TelemetryScript::Report(telemetry));
    }

    pub fn set_lost(&self, address: &str) {
        self.telemetry
            .lock()
            .unwrap()
            .insert(address.into(), TelemetryScript::Lost);
    }

    pub fn set_failing(&self, address: &str) {
        self.telemetry
            .lock()
            .unwrap()
            .insert(address.into(), TelemetryScript::Failing);
    }

    /// Delay telemetry responses for one address.
    pub fn set_delay(&self, address: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(address.into(), delay);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn telemetry_calls(&self) -> usize {
        self.telemetry_calls.load(Ordering::SeqCst)
    }

    /// Non-telemetry calls in order, `"<command> <address> [args..]"`.
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn check_reachable(&self) -> Result<(), GatewayError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(GatewayError::Malformed("connection refused".into()));
        }
        Ok(())
    }

    fn command(&self, entry: String, name: &str) -> Result<GatewayResponse, GatewayError> {
        self.check_reachable()?;
        self.log.lock().unwrap().push(entry);
        Ok(self
            .commands_by_name
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| GatewayResponse::new(200, json!({}))))
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn connect(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.check_reachable()?;
        Ok(self
            .connect
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_else(|| GatewayResponse::new(200, json!({"message": "Connected to drone"}))))
    }

    async fn disconnect(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.check_reachable()?;
        Ok(self
            .disconnect
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_else(|| {
                GatewayResponse::new(200, json!({"message": "Disconnected from drone"}))
            }))
    }

    async fn telemetry(&self, address: &str) -> Result<Telemetry, GatewayError> {
        self.telemetry_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(address).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_reachable()?;

        let script = self.telemetry.lock().unwrap().get(address).cloned();
        match script {
            Some(TelemetryScript::Report(telemetry)) => Ok(telemetry),
            Some(TelemetryScript::Lost) => Err(GatewayError::NotFound),
            Some(TelemetryScript::Failing) => Err(GatewayError::Status {
                status: 500,
                detail: "scripted failure".into(),
            }),
            None => Ok(Telemetry::default()),
        }
    }

    async fn arm(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.command(format!("arm {address}"), "arm")
    }

    async fn land(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.command(format!("land {address}"), "land")
    }

    async fn takeoff(&self, address: &str, altitude: f64) -> Result<GatewayResponse, GatewayError> {
        self.command(format!("takeoff {address} {altitude}"), "takeoff")
    }

    async fn modes(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.check_reachable()?;
        self.log.lock().unwrap().push(format!("modes {address}"));
        Ok(GatewayResponse::new(
            200,
            json!({"modes": ["STABILIZE", "GUIDED", "LAND", "RTL"]}),
        ))
    }

    async fn set_mode(&self, address: &str, mode: &str) -> Result<GatewayResponse, GatewayError> {
        self.command(format!("set_mode {address} {mode}"), "set_mode")
    }

    async fn parameters(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.check_reachable()?;
        self.log.lock().unwrap().push(format!("parameters {address}"));
        Ok(GatewayResponse::new(
            200,
            json!({"ANGLE_MAX": 3000.0, "FS_THR_ENABLE": 1.0}),
        ))
    }

    async fn set_parameter(
        &self,
        address: &str,
        name: &str,
        value: f64,
    ) -> Result<GatewayResponse, GatewayError> {
        self.command(format!("set_parameter {address} {name} {value}"), "set_parameter")
    }
}
