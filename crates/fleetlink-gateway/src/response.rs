//! Raw gateway responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `detail.type` the gateway uses when a link to the vehicle already exists.
pub const ALREADY_CONNECTED: &str = "DroneAlreadyConnectedException";

/// `detail.type` for a command that the vehicle did not acknowledge in time.
pub const ACK_TIMEOUT: &str = "ACKTimeoutException";

/// Status code and JSON body of a gateway call, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Exception class name from an error body shaped
    /// `{"detail": {"type": .., "response": ..}}`.
    pub fn detail_type(&self) -> Option<&str> {
        self.body.get("detail")?.get("type")?.as_str()
    }

    pub fn is_already_connected(&self) -> bool {
        self.detail_type() == Some(ALREADY_CONNECTED)
    }

    pub fn is_ack_timeout(&self) -> bool {
        self.detail_type() == Some(ACK_TIMEOUT)
    }

    /// Human-readable message carried by the body, if any.
    pub fn message(&self) -> Option<&str> {
        if let Some(message) = self.body.get("message").and_then(Value::as_str) {
            return Some(message);
        }
        match self.body.get("detail")? {
            Value::String(detail) => Some(detail.as_str()),
            detail => detail.get("response").and_then(Value::as_str),
        }
    }
}

/// Mode names from a `modes` response: `{"modes": [..]}` or a bare array.
pub fn parse_modes(body: &Value) -> Vec<String> {
    let list = match body {
        Value::Array(items) => items,
        other => match other.get("modes").and_then(Value::as_array) {
            Some(items) => items,
            None => return Vec::new(),
        },
    };
    list.iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn already_connected_detail_is_recognised() {
        let response = GatewayResponse::new(
            500,
            json!({"detail": {"type": ALREADY_CONNECTED, "response": "Drone is already connected"}}),
        );
        assert!(!response.is_success());
        assert!(response.is_already_connected());
        assert_eq!(response.message(), Some("Drone is already connected"));
    }

    #[test]
    fn plain_detail_and_message_bodies() {
        let not_connected = GatewayResponse::new(404, json!({"detail": "Drone not connected"}));
        assert_eq!(not_connected.message(), Some("Drone not connected"));
        assert_eq!(not_connected.detail_type(), None);

        let ok = GatewayResponse::new(200, json!({"message": "Arming"}));
        assert!(ok.is_success());
        assert_eq!(ok.message(), Some("Arming"));
    }

    #[test]
    fn modes_accept_both_shapes() {
        assert_eq!(
            parse_modes(&json!({"modes": ["STABILIZE", "GUIDED"]})),
            vec!["STABILIZE", "GUIDED"]
        );
        assert_eq!(parse_modes(&json!(["LAND"])), vec!["LAND"]);
        assert!(parse_modes(&json!({"detail": "Drone not connected"})).is_empty());
    }
}
