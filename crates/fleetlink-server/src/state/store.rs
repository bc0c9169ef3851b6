//! Fleet state store.
//!
//! Authoritative in-memory registry of connected vehicles. Owns the vehicle
//! lifecycle, merges telemetry poll results into each vehicle's world
//! position, keeps the trajectory tracker in step, and starts/stops the poll
//! loop as the fleet fills and empties.
//!
//! Consumers only ever get copies ([`FleetSnapshot`], [`Vehicle`]); the
//! accumulators never leave the store by reference.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use fleetlink_core::trajectory::{DEFAULT_MAX_SAMPLES, DEFAULT_MIN_DISTANCE};
use fleetlink_core::{FleetSnapshot, Telemetry, TrajectoryTracker, Vec3, Vehicle, VehicleId, VehicleView};
use fleetlink_gateway::{Gateway, GatewayError, GatewayResponse};

use crate::config::Config;
use crate::loops::telemetry_poll_loop::run_telemetry_poll_loop;
use crate::state::notifications::{Notification, NotificationLevel, Notifier};

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("fleet store is shut down")]
    ShutDown,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct FleetSettings {
    pub poll_interval: Duration,
    /// Drop poll responses older than one already applied for the vehicle.
    pub discard_stale_polls: bool,
    pub trajectory_max_samples: usize,
    pub trajectory_min_distance: f64,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            discard_stale_polls: true,
            trajectory_max_samples: DEFAULT_MAX_SAMPLES,
            trajectory_min_distance: DEFAULT_MIN_DISTANCE,
        }
    }
}

impl From<&Config> for FleetSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            discard_stale_polls: config.discard_stale_polls,
            trajectory_max_samples: config.trajectory_max_samples,
            trajectory_min_distance: config.trajectory_min_distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// A new vehicle entry was created.
    Connected { id: VehicleId },
    /// The address was already in the fleet; the existing entry is kept.
    Duplicate { id: VehicleId },
    /// The gateway refused the link.
    Rejected(GatewayResponse),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectOutcome {
    /// The gateway accepted; `id` is the removed vehicle, if one was present.
    Disconnected { id: Option<VehicleId> },
    /// The gateway refused; the vehicle stays connected.
    Rejected(GatewayResponse),
}

/// What a single poll response did to the fleet.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Applied { delta: Vec3, recorded: bool },
    /// An equal or newer response was already applied.
    Stale,
    /// The gateway no longer knows the vehicle; it was removed.
    Lost,
    /// Transient failure, state unchanged.
    Skipped,
    /// The vehicle is gone or the store is shut down.
    Dropped,
}

/// One vehicle poll request issued by the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PollTarget {
    pub id: VehicleId,
    pub connection_string: String,
    pub seq: u64,
}

#[derive(Debug)]
struct VehicleSlot {
    vehicle: Vehicle,
    /// Connect order, for stable snapshot ordering.
    order: u64,
    next_seq: u64,
    applied_seq: u64,
}

struct PollerHandle {
    shutdown: watch::Sender<bool>,
    _task: JoinHandle<()>,
}

pub struct FleetStore {
    gateway: Arc<dyn Gateway>,
    settings: FleetSettings,
    /// Keyed by connection string.
    vehicles: DashMap<String, VehicleSlot>,
    ids: DashMap<VehicleId, String>,
    trajectories: Mutex<TrajectoryTracker>,
    notifier: Notifier,
    poller: Mutex<Option<PollerHandle>>,
    connect_order: AtomicU64,
    closed: AtomicBool,
}

impl FleetStore {
    pub fn new(gateway: Arc<dyn Gateway>, settings: FleetSettings) -> Self {
        let tracker = TrajectoryTracker::new(
            settings.trajectory_max_samples,
            settings.trajectory_min_distance,
        );
        Self {
            gateway,
            settings,
            vehicles: DashMap::new(),
            ids: DashMap::new(),
            trajectories: Mutex::new(tracker),
            notifier: Notifier::new(),
            poller: Mutex::new(None),
            connect_order: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    fn tracker(&self) -> MutexGuard<'_, TrajectoryTracker> {
        self.trajectories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn poller(&self) -> MutexGuard<'_, Option<PollerHandle>> {
        self.poller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========== LIFECYCLE ==========

    /// Link a vehicle through the gateway and add it to the fleet.
    ///
    /// A gateway "already connected" answer is treated as a successful
    /// attach. A vehicle already in the local fleet is left untouched.
    pub async fn connect(
        self: &Arc<Self>,
        connection_string: &str,
        initial_world_position: Vec3,
    ) -> Result<ConnectOutcome, FleetError> {
        if self.is_closed() {
            self.notifier
                .error(connection_string, "Error connecting to drone");
            return Err(FleetError::ShutDown);
        }

        let response = match self.gateway.connect(connection_string).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("Connect to {} failed: {}", connection_string, err);
                self.notifier
                    .error(connection_string, "Error connecting to drone");
                return Err(err.into());
            }
        };

        if !response.is_success() && !response.is_already_connected() {
            tracing::warn!(
                "Gateway refused connection to {} ({})",
                connection_string,
                response.status
            );
            self.notifier
                .error(connection_string, "Error connecting to drone");
            return Ok(ConnectOutcome::Rejected(response));
        }

        let id = match self.vehicles.entry(connection_string.to_string()) {
            Entry::Occupied(existing) => {
                let id = existing.get().vehicle.id;
                drop(existing);
                self.notifier
                    .warning(connection_string, "Drone already connected");
                return Ok(ConnectOutcome::Duplicate { id });
            }
            Entry::Vacant(slot) => {
                let vehicle = Vehicle::new(connection_string, initial_world_position);
                let id = vehicle.id;
                self.ids.insert(id, connection_string.to_string());
                self.tracker().record(id, vehicle.world_position);
                slot.insert(VehicleSlot {
                    vehicle,
                    order: self.connect_order.fetch_add(1, Ordering::SeqCst),
                    next_seq: 0,
                    applied_seq: 0,
                });
                id
            }
        };

        tracing::info!("Vehicle {} connected as {}", connection_string, id);
        self.notifier.success(connection_string, "Connected to drone");
        self.start_polling();
        Ok(ConnectOutcome::Connected { id })
    }

    /// Unlink a vehicle. Only a successful gateway answer removes it locally,
    /// so the operator can retry after a failure.
    pub async fn disconnect(
        self: &Arc<Self>,
        connection_string: &str,
    ) -> Result<DisconnectOutcome, FleetError> {
        let response = match self.gateway.disconnect(connection_string).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("Disconnect from {} failed: {}", connection_string, err);
                self.notifier
                    .error(connection_string, "Error disconnecting drone");
                return Err(err.into());
            }
        };

        if !response.is_success() {
            tracing::warn!(
                "Gateway refused disconnect of {} ({})",
                connection_string,
                response.status
            );
            self.notifier
                .error(connection_string, "Error disconnecting drone");
            return Ok(DisconnectOutcome::Rejected(response));
        }

        let id = self.remove_vehicle(connection_string, None);
        self.notifier.success(connection_string, "Drone disconnected");
        Ok(DisconnectOutcome::Disconnected { id })
    }

    /// Remove a vehicle and its trajectory. With `expected` set, only that
    /// vehicle identity is removed (a reconnect under the same address is
    /// left alone). Stops polling when the fleet empties.
    fn remove_vehicle(&self, connection_string: &str, expected: Option<VehicleId>) -> Option<VehicleId> {
        let (_, slot) = self.vehicles.remove_if(connection_string, |_, slot| {
            expected.map_or(true, |id| slot.vehicle.id == id)
        })?;
        let id = slot.vehicle.id;
        self.ids.remove(&id);
        self.tracker().remove(id);
        tracing::info!("Vehicle {} ({}) removed", connection_string, id);

        self.stop_polling_if_empty();
        Some(id)
    }

    // ========== POLLING ==========

    /// Start the telemetry poll loop. No-op while it is already running.
    pub fn start_polling(self: &Arc<Self>) {
        if self.is_closed() {
            return;
        }
        let mut poller = self.poller();
        if poller.is_some() {
            return;
        }

        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(run_telemetry_poll_loop(
            Arc::downgrade(self),
            self.settings.poll_interval,
            rx,
        ));
        *poller = Some(PollerHandle {
            shutdown,
            _task: task,
        });
        tracing::info!(
            "Telemetry polling started ({:?} interval)",
            self.settings.poll_interval
        );
    }

    /// Stop the telemetry poll loop. No-op while it is already stopped.
    pub fn stop_polling(&self) {
        if let Some(handle) = self.poller().take() {
            let _ = handle.shutdown.send(true);
            tracing::info!("Telemetry polling stopped");
        }
    }

    /// Emptiness is checked under the poller lock so a concurrent connect
    /// cannot be left without a running loop.
    fn stop_polling_if_empty(&self) {
        let mut poller = self.poller();
        if !self.vehicles.is_empty() {
            return;
        }
        if let Some(handle) = poller.take() {
            let _ = handle.shutdown.send(true);
            tracing::info!("Fleet empty, telemetry polling stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller().is_some()
    }

    /// Stop polling and refuse further work. Responses still in flight are
    /// dropped when they complete.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.stop_polling();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Issue one poll request per connected vehicle, each with the next
    /// sequence number for that vehicle.
    pub fn poll_targets(&self) -> Vec<PollTarget> {
        self.vehicles
            .iter_mut()
            .map(|mut entry| {
                let slot = entry.value_mut();
                slot.next_seq += 1;
                PollTarget {
                    id: slot.vehicle.id,
                    connection_string: slot.vehicle.connection_string.clone(),
                    seq: slot.next_seq,
                }
            })
            .collect()
    }

    /// Poll one vehicle and merge the result.
    pub async fn poll_vehicle(&self, target: PollTarget) -> PollOutcome {
        let result = self.gateway.telemetry(&target.connection_string).await;
        self.apply_poll_result(&target, result)
    }

    /// Merge a poll response into the fleet.
    pub fn apply_poll_result(
        &self,
        target: &PollTarget,
        result: Result<Telemetry, GatewayError>,
    ) -> PollOutcome {
        if self.is_closed() {
            return PollOutcome::Dropped;
        }

        match result {
            Ok(telemetry) => self.merge_telemetry(target, Some(target.seq), telemetry),
            Err(GatewayError::NotFound) => {
                if self
                    .remove_vehicle(&target.connection_string, Some(target.id))
                    .is_some()
                {
                    self.notifier
                        .error(&target.connection_string, "Drone connection lost");
                    PollOutcome::Lost
                } else {
                    PollOutcome::Dropped
                }
            }
            Err(err) => {
                tracing::warn!(
                    "Error updating drone info for {}: {}",
                    target.connection_string,
                    err
                );
                PollOutcome::Skipped
            }
        }
    }

    /// Apply telemetry to a vehicle by id, bypassing sequencing.
    pub fn update_from_poll(&self, id: VehicleId, telemetry: Telemetry) -> PollOutcome {
        let Some(connection_string) = self.ids.get(&id).map(|cs| cs.value().clone()) else {
            return PollOutcome::Dropped;
        };
        let target = PollTarget {
            id,
            connection_string,
            seq: 0,
        };
        self.merge_telemetry(&target, None, telemetry)
    }

    fn merge_telemetry(&self, target: &PollTarget, seq: Option<u64>, telemetry: Telemetry) -> PollOutcome {
        let Some(mut slot) = self.vehicles.get_mut(&target.connection_string) else {
            return PollOutcome::Dropped;
        };
        if slot.vehicle.id != target.id {
            return PollOutcome::Dropped;
        }

        if let Some(seq) = seq {
            if self.settings.discard_stale_polls && seq <= slot.applied_seq {
                tracing::debug!(
                    "Discarding stale poll #{} for {} (applied #{})",
                    seq,
                    target.connection_string,
                    slot.applied_seq
                );
                return PollOutcome::Stale;
            }
            slot.applied_seq = slot.applied_seq.max(seq);
        }

        let delta = slot.vehicle.apply_telemetry(telemetry);
        // Recorded under the vehicle guard so a concurrent removal cannot
        // leave an orphaned trajectory behind.
        let recorded = self.tracker().record(target.id, slot.vehicle.world_position);
        PollOutcome::Applied { delta, recorded }
    }

    // ========== COMMANDS ==========

    pub async fn arm(&self, connection_string: &str) -> Result<GatewayResponse, FleetError> {
        let result = self.gateway.arm(connection_string).await;
        self.report_command(connection_string, "Arming", result)
    }

    pub async fn land(&self, connection_string: &str) -> Result<GatewayResponse, FleetError> {
        let result = self.gateway.land(connection_string).await;
        self.report_command(connection_string, "Landing", result)
    }

    pub async fn takeoff(
        &self,
        connection_string: &str,
        altitude: f64,
    ) -> Result<GatewayResponse, FleetError> {
        let result = self.gateway.takeoff(connection_string, altitude).await;
        self.report_command(connection_string, "Taking off", result)
    }

    pub async fn set_mode(
        &self,
        connection_string: &str,
        mode: &str,
    ) -> Result<GatewayResponse, FleetError> {
        let result = self.gateway.set_mode(connection_string, mode).await;
        self.report_command(connection_string, &format!("Setting mode to {mode}"), result)
    }

    pub async fn set_parameter(
        &self,
        connection_string: &str,
        name: &str,
        value: f64,
    ) -> Result<GatewayResponse, FleetError> {
        let result = self
            .gateway
            .set_parameter(connection_string, name, value)
            .await;
        self.report_command(
            connection_string,
            &format!("Setting parameter {name} to {value}"),
            result,
        )
    }

    /// Read-only; no notification.
    pub async fn modes(&self, connection_string: &str) -> Result<GatewayResponse, FleetError> {
        Ok(self.gateway.modes(connection_string).await?)
    }

    /// Read-only; no notification.
    pub async fn parameters(&self, connection_string: &str) -> Result<GatewayResponse, FleetError> {
        Ok(self.gateway.parameters(connection_string).await?)
    }

    /// Publish exactly one notification for a command and pass the response
    /// through.
    fn report_command(
        &self,
        connection_string: &str,
        action: &str,
        result: Result<GatewayResponse, GatewayError>,
    ) -> Result<GatewayResponse, FleetError> {
        match result {
            Ok(response) if response.is_success() => {
                let message = response.message().unwrap_or(action).to_string();
                self.notifier.success(connection_string, message);
                Ok(response)
            }
            Ok(response) => {
                let message = response
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{action} failed"));
                let level = if response.is_ack_timeout() {
                    NotificationLevel::Warning
                } else {
                    NotificationLevel::Error
                };
                self.notifier.publish(level, connection_string, message);
                Ok(response)
            }
            Err(err) => {
                tracing::warn!("{} for {} failed: {}", action, connection_string, err);
                self.notifier
                    .error(connection_string, format!("{action} failed"));
                Err(err.into())
            }
        }
    }

    // ========== QUERIES ==========

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn vehicle(&self, connection_string: &str) -> Option<Vehicle> {
        self.vehicles
            .get(connection_string)
            .map(|slot| slot.vehicle.clone())
    }

    pub fn vehicle_by_id(&self, id: VehicleId) -> Option<Vehicle> {
        let connection_string = self.ids.get(&id)?.value().clone();
        self.vehicle(&connection_string)
            .filter(|vehicle| vehicle.id == id)
    }

    /// Vehicles in connect order.
    pub fn vehicles(&self) -> Vec<Vehicle> {
        let mut slots: Vec<(u64, Vehicle)> = self
            .vehicles
            .iter()
            .map(|slot| (slot.order, slot.vehicle.clone()))
            .collect();
        slots.sort_by_key(|(order, _)| *order);
        slots.into_iter().map(|(_, vehicle)| vehicle).collect()
    }

    /// Recorded display-space samples for a vehicle.
    pub fn trajectory(&self, id: VehicleId) -> Option<Vec<Vec3>> {
        self.tracker().samples(id)
    }

    /// Copy of the whole fleet with the trajectories of connected vehicles.
    ///
    /// Read-only: removal prunes the tracker, and entries of vehicles missing
    /// from this copy are filtered out rather than dropped.
    pub fn snapshot(&self) -> FleetSnapshot {
        let vehicles = self.vehicles();
        let ids: Vec<VehicleId> = vehicles.iter().map(|v| v.id).collect();

        let tracker = self.tracker();
        let views = vehicles
            .iter()
            .map(|vehicle| VehicleView::from_vehicle(vehicle, tracker.color_of(vehicle.id)))
            .collect();
        let trajectories = tracker.visible(&ids);

        FleetSnapshot {
            vehicles: views,
            trajectories,
        }
    }
}
