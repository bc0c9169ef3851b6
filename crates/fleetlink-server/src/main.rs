//! Fleetlink Server - telemetry sync engine behind the ground-control dashboard

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleetlink_server::api;
use fleetlink_server::config::Config;
use fleetlink_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("fleetlink_server=debug".parse()?))
        .init();

    tracing::info!("Starting Fleetlink Server...");

    let config = Config::from_env();
    let port = config.server_port;
    tracing::info!(
        "Gateway {} (poll every {}ms, timeout {}ms)",
        config.gateway_url,
        config.poll_interval_ms,
        config.gateway_timeout_ms
    );

    // Polling starts with the first connected vehicle.
    let state = Arc::new(AppState::new(config.clone())?);
    let fleet = state.fleet.clone();

    let app = api::routes(&config)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    fleet.shutdown();
    Ok(())
}
