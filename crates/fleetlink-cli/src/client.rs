//! HTTP client for the fleetlink server API.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};

use fleetlink_core::{escape_address, FleetSnapshot, Vec3};
use fleetlink_gateway::GatewayResponse;

/// Client for the server's `/v1` routes.
pub struct FleetClient {
    base_url: Url,
    client: reqwest::Client,
}

impl FleetClient {
    /// Create a new fleet client.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid fleetlink server URL {base_url:?}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Fleetlink server URL {base_url} cannot carry a path");
        }
        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
        })
    }

    /// URL under `/v1`; each segment is percent-encoded on its own.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("v1").extend(segments);
        }
        url
    }

    /// URL for a per-vehicle route: `/v1/vehicles/{escaped address}/{segments..}`.
    fn vehicle_url(&self, address: &str, segments: &[&str]) -> Result<Url> {
        let escaped = escape_address(address)?;
        let mut all = vec!["vehicles", escaped.as_str()];
        all.extend_from_slice(segments);
        Ok(self.url(&all))
    }

    /// Current fleet snapshot.
    pub async fn fleet(&self) -> Result<FleetSnapshot> {
        let response = self
            .client
            .get(self.url(&["fleet"]))
            .send()
            .await
            .context("Failed to reach fleetlink server")?;
        if !response.status().is_success() {
            anyhow::bail!("Fleet request failed: {}", response.status());
        }
        response.json().await.context("Invalid fleet snapshot")
    }

    pub async fn connect(&self, address: &str, initial_position: Vec3) -> Result<GatewayResponse> {
        let url = self.url(&["vehicles"]);
        let body = json!({
            "connection_string": address,
            "initial_position": initial_position,
        });
        self.send(self.client.post(url).json(&body)).await
    }

    pub async fn disconnect(&self, address: &str) -> Result<GatewayResponse> {
        let url = self.vehicle_url(address, &[])?;
        self.send(self.client.delete(url)).await
    }

    pub async fn arm(&self, address: &str) -> Result<GatewayResponse> {
        self.post(self.vehicle_url(address, &["arm"])?, &json!({})).await
    }

    pub async fn land(&self, address: &str) -> Result<GatewayResponse> {
        self.post(self.vehicle_url(address, &["land"])?, &json!({})).await
    }

    pub async fn takeoff(&self, address: &str, altitude: f64) -> Result<GatewayResponse> {
        self.post(self.vehicle_url(address, &["takeoff"])?, &json!({ "altitude": altitude }))
            .await
    }

    pub async fn modes(&self, address: &str) -> Result<GatewayResponse> {
        let url = self.vehicle_url(address, &["modes"])?;
        self.send(self.client.get(url)).await
    }

    pub async fn set_mode(&self, address: &str, mode: &str) -> Result<GatewayResponse> {
        self.post(self.vehicle_url(address, &["mode"])?, &json!({ "mode": mode }))
            .await
    }

    pub async fn parameters(&self, address: &str) -> Result<GatewayResponse> {
        let url = self.vehicle_url(address, &["parameters"])?;
        self.send(self.client.get(url)).await
    }

    pub async fn set_parameter(&self, address: &str, name: &str, value: f64) -> Result<GatewayResponse> {
        let url = self.vehicle_url(address, &["parameters", name])?;
        self.send(self.client.put(url).json(&json!({ "value": value })))
            .await
    }

    async fn post<T: Serialize>(&self, url: Url, body: &T) -> Result<GatewayResponse> {
        self.send(self.client.post(url).json(body)).await
    }

    /// Send a request and keep status and body whatever the outcome.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<GatewayResponse> {
        let response = request
            .send()
            .await
            .context("Failed to reach fleetlink server")?;
        let status = response.status().as_u16();
        let text = response.text().await.context("Failed to read response")?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(GatewayResponse::new(status, body))
    }
}
