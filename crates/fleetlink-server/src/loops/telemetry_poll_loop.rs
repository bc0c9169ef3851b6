//! Telemetry poll loop.
//!
//! Every tick fans out one independent request per connected vehicle, so a
//! slow or unreachable vehicle never holds up the rest of the fleet. Ticks do
//! not wait for earlier requests to finish.

use std::sync::Weak;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::state::{FleetStore, PollOutcome};

/// Run until `shutdown` fires or the store is dropped.
pub async fn run_telemetry_poll_loop(
    fleet: Weak<FleetStore>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                tracing::info!("Telemetry poll loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                if *shutdown.borrow() {
                    break;
                }
                let Some(fleet) = fleet.upgrade() else {
                    break;
                };

                let targets = fleet.poll_targets();
                tracing::trace!("Polling {} vehicle(s)", targets.len());
                for target in targets {
                    let fleet = fleet.clone();
                    tokio::spawn(async move {
                        let address = target.connection_string.clone();
                        match fleet.poll_vehicle(target).await {
                            PollOutcome::Lost => {
                                tracing::warn!("Vehicle {} lost, removed from fleet", address)
                            }
                            PollOutcome::Stale => {
                                tracing::debug!("Out-of-order telemetry for {} ignored", address)
                            }
                            _ => {}
                        }
                    });
                }
            }
        }
    }
}
