//! WebSocket streaming for the dashboard.
//!
//! Each client gets a full fleet snapshot every stream interval, plus every
//! notification as soon as it is published.
use crate::state::{AppState, Notification};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use fleetlink_core::FleetSnapshot;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, MissedTickBehavior};

/// Frames pushed to stream subscribers.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Snapshot(FleetSnapshot),
    Notification(Notification),
}

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.fleet.subscribe();
    let mut ticker = interval(state.config().stream_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let frame = tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) | None => break,
                }
            }
            _ = ticker.tick() => StreamMessage::Snapshot(state.fleet.snapshot()),
            event = rx.recv() => {
                match event {
                    Ok(notification) => StreamMessage::Notification(notification),
                    Err(RecvError::Lagged(missed)) => {
                        tracing::debug!("Stream client lagged, {} notifications dropped", missed);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        };

        let payload = match serde_json::to_string(&frame) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!("Failed to encode stream frame: {}", err);
                continue;
            }
        };
        if socket.send(Message::Text(payload)).await.is_err() {
            break;
        }
    }
}
