//! REST API routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use fleetlink_core::{unescape_address, Vec3};
use fleetlink_gateway::client::DEFAULT_LOG_ENTRIES;
use fleetlink_gateway::{GatewayError, GatewayResponse};

use crate::api::ws;
use crate::config::Config;
use crate::state::{AppState, ConnectOutcome, DisconnectOutcome, FleetError};

/// Create the API router.
pub fn create_router(_config: &Config) -> Router<Arc<AppState>> {
    let fleet_routes = Router::new()
        .route("/v1/fleet", get(get_fleet))
        .route("/v1/vehicles", post(connect_vehicle))
        .route("/v1/vehicles/:address", delete(disconnect_vehicle))
        .route("/v1/vehicles/:address/arm", post(arm_vehicle))
        .route("/v1/vehicles/:address/land", post(land_vehicle))
        .route("/v1/vehicles/:address/takeoff", post(takeoff_vehicle))
        .route("/v1/vehicles/:address/modes", get(get_modes))
        .route("/v1/vehicles/:address/mode", post(set_mode))
        .route("/v1/vehicles/:address/parameters", get(get_parameters))
        .route("/v1/vehicles/:address/parameters/:name", put(set_parameter));

    let log_routes = Router::new()
        .route("/v1/logs", get(list_logs))
        .route("/v1/logs/:filename", get(get_log).delete(delete_log))
        .route("/v1/logs/:filename/download", get(log_download_url));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/stream", get(ws::ws_handler))
        .merge(fleet_routes)
        .merge(log_routes)
}

// === Request types ===

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub connection_string: String,
    /// Operator-chosen world offset; origin when omitted.
    #[serde(default)]
    pub initial_position: Option<Vec3>,
}

#[derive(Debug, Deserialize)]
pub struct TakeoffRequest {
    pub altitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: String,
}

#[derive(Debug, Deserialize)]
pub struct SetParameterRequest {
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub connection_string: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogContentQuery {
    pub max_entries: Option<u32>,
}

// === Response helpers ===

/// Gateway status and body, verbatim.
fn passthrough(response: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(response.body)).into_response()
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn gateway_error_response(err: GatewayError) -> Response {
    let status = match &err {
        GatewayError::Address(_) => StatusCode::BAD_REQUEST,
        GatewayError::NotFound => StatusCode::NOT_FOUND,
        GatewayError::Status { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        GatewayError::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::Transport(_) | GatewayError::Malformed(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.to_string())
}

fn fleet_error_response(err: FleetError) -> Response {
    match err {
        FleetError::ShutDown => error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        FleetError::Gateway(err) => gateway_error_response(err),
    }
}

fn command_result(result: Result<GatewayResponse, FleetError>) -> Response {
    match result {
        Ok(response) => passthrough(response),
        Err(err) => fleet_error_response(err),
    }
}

// === Fleet handlers ===

async fn get_fleet(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.fleet.snapshot())
}

async fn connect_vehicle(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConnectRequest>,
) -> Response {
    let connection_string = req.connection_string.trim();
    if connection_string.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "connection_string is required");
    }
    let initial_position = req.initial_position.unwrap_or(Vec3::ZERO);
    if !initial_position.is_finite() {
        return error_response(StatusCode::BAD_REQUEST, "initial_position must be finite");
    }

    match state.fleet.connect(connection_string, initial_position).await {
        Ok(ConnectOutcome::Connected { id }) => (
            StatusCode::CREATED,
            Json(json!({
                "id": id,
                "connection_string": connection_string,
                "message": "Connected to drone",
            })),
        )
            .into_response(),
        Ok(ConnectOutcome::Duplicate { id }) => (
            StatusCode::OK,
            Json(json!({
                "id": id,
                "connection_string": connection_string,
                "message": "Drone already connected",
            })),
        )
            .into_response(),
        Ok(ConnectOutcome::Rejected(response)) => passthrough(response),
        Err(err) => fleet_error_response(err),
    }
}

async fn disconnect_vehicle(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Response {
    let connection_string = unescape_address(&address);
    match state.fleet.disconnect(&connection_string).await {
        Ok(DisconnectOutcome::Disconnected { id }) => Json(json!({
            "id": id,
            "connection_string": connection_string,
            "message": "Drone disconnected",
        }))
        .into_response(),
        Ok(DisconnectOutcome::Rejected(response)) => passthrough(response),
        Err(err) => fleet_error_response(err),
    }
}

async fn arm_vehicle(State(state): State<Arc<AppState>>, Path(address): Path<String>) -> Response {
    command_result(state.fleet.arm(&unescape_address(&address)).await)
}

async fn land_vehicle(State(state): State<Arc<AppState>>, Path(address): Path<String>) -> Response {
    command_result(state.fleet.land(&unescape_address(&address)).await)
}

async fn takeoff_vehicle(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Json(req): Json<TakeoffRequest>,
) -> Response {
    if !req.altitude.is_finite() || req.altitude <= 0.0 {
        return error_response(StatusCode::BAD_REQUEST, "altitude must be a positive number");
    }
    command_result(
        state
            .fleet
            .takeoff(&unescape_address(&address), req.altitude)
            .await,
    )
}

async fn get_modes(State(state): State<Arc<AppState>>, Path(address): Path<String>) -> Response {
    command_result(state.fleet.modes(&unescape_address(&address)).await)
}

async fn set_mode(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Json(req): Json<SetModeRequest>,
) -> Response {
    let mode = req.mode.trim();
    if mode.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "mode is required");
    }
    command_result(state.fleet.set_mode(&unescape_address(&address), mode).await)
}

async fn get_parameters(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Response {
    command_result(state.fleet.parameters(&unescape_address(&address)).await)
}

async fn set_parameter(
    State(state): State<Arc<AppState>>,
    Path((address, name)): Path<(String, String)>,
    Json(req): Json<SetParameterRequest>,
) -> Response {
    if !req.value.is_finite() {
        return error_response(StatusCode::BAD_REQUEST, "value must be finite");
    }
    command_result(
        state
            .fleet
            .set_parameter(&unescape_address(&address), &name, req.value)
            .await,
    )
}

// === Log read-through ===

async fn list_logs(State(state): State<Arc<AppState>>, Query(query): Query<LogsQuery>) -> Response {
    match state.gateway.list_logs(query.connection_string.as_deref()).await {
        Ok(response) => passthrough(response),
        Err(err) => gateway_error_response(err),
    }
}

async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(query): Query<LogContentQuery>,
) -> Response {
    let max_entries = query.max_entries.unwrap_or(DEFAULT_LOG_ENTRIES);
    match state.gateway.log_content(&filename, max_entries).await {
        Ok(response) => passthrough(response),
        Err(err) => gateway_error_response(err),
    }
}

async fn delete_log(State(state): State<Arc<AppState>>, Path(filename): Path<String>) -> Response {
    match state.gateway.delete_log(&filename).await {
        Ok(response) => passthrough(response),
        Err(err) => gateway_error_response(err),
    }
}

async fn log_download_url(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Json<Value> {
    Json(json!({ "url": state.gateway.log_download_url(&filename).to_string() }))
}
