//! Gateway HTTP client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

use fleetlink_core::{escape_address, Telemetry};

use crate::error::GatewayError;
use crate::response::GatewayResponse;
use crate::Gateway;

/// Default number of log lines returned by `log_content`.
pub const DEFAULT_LOG_ENTRIES: u32 = 1000;

/// HTTP client for the vehicle gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
}

impl GatewayClient {
    /// Create a new gateway client. `timeout` bounds every request.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid gateway URL {base_url:?}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Gateway URL {base_url} cannot carry a path");
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL for a per-vehicle route: `/{escaped address}/{segments..}`.
    fn vehicle_url(&self, address: &str, segments: &[&str]) -> Result<Url, GatewayError> {
        let escaped = escape_address(address)?;
        let mut all = Vec::with_capacity(segments.len() + 1);
        all.push(escaped.as_str());
        all.extend_from_slice(segments);
        Ok(self.url(&all))
    }

    async fn get(&self, url: Url) -> Result<GatewayResponse, GatewayError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        read_response(response).await
    }

    /// List flight logs, optionally filtered by vehicle address.
    pub async fn list_logs(
        &self,
        connection_string: Option<&str>,
    ) -> Result<GatewayResponse, GatewayError> {
        let mut url = self.url(&["logs"]);
        if let Some(filter) = connection_string {
            url.query_pairs_mut().append_pair("connection_string", filter);
        }
        self.get(url).await
    }

    /// First `max_entries` entries of a log file.
    pub async fn log_content(
        &self,
        filename: &str,
        max_entries: u32,
    ) -> Result<GatewayResponse, GatewayError> {
        let mut url = self.url(&["logs", filename]);
        url.query_pairs_mut()
            .append_pair("max_entries", &max_entries.to_string());
        self.get(url).await
    }

    pub async fn delete_log(&self, filename: &str) -> Result<GatewayResponse, GatewayError> {
        let url = self.url(&["logs", filename]);
        tracing::debug!("DELETE {}", url);
        let response = self.client.delete(url).send().await?;
        read_response(response).await
    }

    /// Direct download link for a log file, for handing to a browser.
    pub fn log_download_url(&self, filename: &str) -> Url {
        self.url(&["logs", "download", filename])
    }
}

/// Capture status and body. Bodies that are not JSON are kept as a string.
async fn read_response(response: reqwest::Response) -> Result<GatewayResponse, GatewayError> {
    let status = response.status().as_u16();
    let bytes = response.bytes().await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok(GatewayResponse { status, body })
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn connect(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        let escaped = escape_address(address)?;
        self.get(self.url(&["connect", &escaped])).await
    }

    async fn disconnect(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.get(self.vehicle_url(address, &["disconnect"])?).await
    }

    async fn telemetry(&self, address: &str) -> Result<Telemetry, GatewayError> {
        let url = self.vehicle_url(address, &["drone_info"])?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                detail: body,
            });
        }

        let bytes = response.bytes().await?;
        let telemetry: Telemetry = serde_json::from_slice(&bytes)?;
        Ok(telemetry.validate()?)
    }

    async fn arm(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.get(self.vehicle_url(address, &["arm"])?).await
    }

    async fn land(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.get(self.vehicle_url(address, &["land"])?).await
    }

    async fn takeoff(&self, address: &str, altitude: f64) -> Result<GatewayResponse, GatewayError> {
        let altitude = altitude.to_string();
        self.get(self.vehicle_url(address, &["takeoff", &altitude])?)
            .await
    }

    async fn modes(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.get(self.vehicle_url(address, &["modes"])?).await
    }

    async fn set_mode(&self, address: &str, mode: &str) -> Result<GatewayResponse, GatewayError> {
        self.get(self.vehicle_url(address, &["set_mode", mode])?)
            .await
    }

    async fn parameters(&self, address: &str) -> Result<GatewayResponse, GatewayError> {
        self.get(self.vehicle_url(address, &["drone_parameters"])?)
            .await
    }

    async fn set_parameter(
        &self,
        address: &str,
        name: &str,
        value: f64,
    ) -> Result<GatewayResponse, GatewayError> {
        let value = value.to_string();
        self.get(self.vehicle_url(address, &["set_parameter", name, &value])?)
            .await
    }
}
