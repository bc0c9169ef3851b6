//! End-to-end fleet scenarios against an in-process fake gateway.
//!
//! The fake speaks the gateway's HTTP contract; the engine talks to it
//! through the real `GatewayClient`, so these cover address escaping,
//! telemetry parsing and the poll loop together.

use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleetlink_core::Vec3;
use fleetlink_gateway::GatewayClient;
use fleetlink_server::state::{ConnectOutcome, FleetSettings, FleetStore, NotificationLevel};

#[derive(Clone, Copy)]
enum Link {
    At(Vec3),
    Lost,
}

/// Links keyed by escaped address.
type Links = Arc<Mutex<HashMap<String, Link>>>;

async fn spawn_gateway(links: Links) -> String {
    let app = Router::new().fallback(move |uri: Uri| {
        let links = links.clone();
        async move {
            let segments: Vec<&str> = uri.path().trim_start_matches('/').split('/').collect();
            match segments.as_slice() {
                ["connect", address] => {
                    links
                        .lock()
                        .unwrap()
                        .entry(address.to_string())
                        .or_insert(Link::At(Vec3::ZERO));
                    (StatusCode::OK, Json(json!({"message": "Connected to drone"})))
                }
                [address, "disconnect"] => {
                    links.lock().unwrap().remove(*address);
                    (StatusCode::OK, Json(json!({"message": "Disconnected from drone"})))
                }
                [address, "drone_info"] => match links.lock().unwrap().get(*address).copied() {
                    Some(Link::At(position)) => (
                        StatusCode::OK,
                        Json(json!({
                            "armed": false,
                            "mode": "STABILIZE",
                            "position": position,
                            "battery_level": 100
                        })),
                    ),
                    _ => (
                        StatusCode::NOT_FOUND,
                        Json(json!({"detail": "Drone not connected"})),
                    ),
                },
                _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not Found"}))),
            }
            .into_response()
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn move_to(links: &Links, escaped: &str, position: Vec3) {
    links
        .lock()
        .unwrap()
        .insert(escaped.to_string(), Link::At(position));
}

async fn wait_for(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

async fn setup() -> (Arc<FleetStore>, Links) {
    let links: Links = Arc::new(Mutex::new(HashMap::new()));
    let url = spawn_gateway(links.clone()).await;
    let client = GatewayClient::new(&url, Duration::from_secs(1)).unwrap();
    let settings = FleetSettings {
        poll_interval: Duration::from_millis(20),
        ..FleetSettings::default()
    };
    (Arc::new(FleetStore::new(Arc::new(client), settings)), links)
}

#[tokio::test]
async fn telemetry_moves_vehicle_and_grows_trajectory() {
    let (fleet, links) = setup().await;

    let ConnectOutcome::Connected { id } = fleet
        .connect("udp:127.0.0.1:14550", Vec3::new(10.0, 0.0, 0.0))
        .await
        .unwrap()
    else {
        panic!("expected a new vehicle");
    };
    assert!(fleet.is_polling());

    // First report is measured against zeroed telemetry.
    move_to(&links, "udp:127.0.0.1:14550", Vec3::new(1.0, 0.0, 0.0));
    wait_for(|| fleet.vehicle("udp:127.0.0.1:14550").unwrap().world_position.x == 11.0).await;

    move_to(&links, "udp:127.0.0.1:14550", Vec3::new(3.0, 0.0, -2.0));
    wait_for(|| {
        fleet.vehicle("udp:127.0.0.1:14550").unwrap().world_position == Vec3::new(13.0, 0.0, -2.0)
    })
    .await;

    let snapshot = fleet.snapshot();
    let trajectory = snapshot.trajectory(id).unwrap();
    assert_eq!(trajectory.points.len(), 3);
    assert_eq!(trajectory.points[2], Vec3::new(0.0, 2.0, 13.0));
    assert_eq!(snapshot.vehicles[0].telemetry.mode, "STABILIZE");
    assert!(snapshot.vehicles[0].armable);
    fleet.shutdown();
}

#[tokio::test]
async fn vehicles_move_independently() {
    let (fleet, links) = setup().await;
    fleet.connect("udp:127.0.0.1:14550", Vec3::ZERO).await.unwrap();
    fleet.connect("/dev/ttyUSB0", Vec3::new(0.0, 5.0, 0.0)).await.unwrap();

    move_to(&links, "+dev+ttyUSB0", Vec3::new(0.0, 1.0, 0.0));
    wait_for(|| fleet.vehicle("/dev/ttyUSB0").unwrap().world_position.y == 6.0).await;

    assert_eq!(
        fleet.vehicle("udp:127.0.0.1:14550").unwrap().world_position,
        Vec3::ZERO
    );
    let colors: Vec<_> = fleet
        .snapshot()
        .vehicles
        .iter()
        .map(|v| v.color.clone().unwrap())
        .collect();
    assert_ne!(colors[0], colors[1]);
    fleet.shutdown();
}

#[tokio::test]
async fn lost_vehicle_is_dropped_and_polling_stops() {
    let (fleet, links) = setup().await;
    let mut rx = fleet.subscribe();
    fleet.connect("udp:127.0.0.1:14550", Vec3::ZERO).await.unwrap();
    assert_eq!(rx.recv().await.unwrap().message, "Connected to drone");

    links
        .lock()
        .unwrap()
        .insert("udp:127.0.0.1:14550".to_string(), Link::Lost);
    wait_for(|| fleet.is_empty()).await;

    let lost = rx.recv().await.unwrap();
    assert_eq!(lost.level, NotificationLevel::Error);
    assert_eq!(lost.message, "Drone connection lost");
    assert!(!fleet.is_polling());
    assert!(fleet.snapshot().trajectories.is_empty());
}

#[tokio::test]
async fn disconnect_releases_gateway_link() {
    let (fleet, links) = setup().await;
    fleet.connect("/dev/ttyUSB0", Vec3::ZERO).await.unwrap();
    assert!(links.lock().unwrap().contains_key("+dev+ttyUSB0"));

    fleet.disconnect("/dev/ttyUSB0").await.unwrap();
    assert!(fleet.is_empty());
    assert!(!fleet.is_polling());
    assert!(!links.lock().unwrap().contains_key("+dev+ttyUSB0"));
}
