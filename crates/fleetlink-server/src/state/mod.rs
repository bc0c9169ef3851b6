//! Shared server state.

pub mod notifications;
pub mod store;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use fleetlink_gateway::GatewayClient;

use crate::config::Config;
pub use notifications::{Notification, NotificationLevel, Notifier};
pub use store::{
    ConnectOutcome, DisconnectOutcome, FleetError, FleetSettings, FleetStore, PollOutcome,
    PollTarget,
};

/// Application state injected into every route.
pub struct AppState {
    pub fleet: Arc<FleetStore>,
    /// Direct client for the log read-through routes.
    pub gateway: GatewayClient,
    config: Config,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let gateway = GatewayClient::new(&config.gateway_url, config.gateway_timeout())?;
        let fleet = Arc::new(FleetStore::new(
            Arc::new(gateway.clone()),
            FleetSettings::from(&config),
        ));
        Ok(Self {
            fleet,
            gateway,
            config,
        })
    }

    /// State around an existing fleet store; logs still go to `config.gateway_url`.
    pub fn with_fleet(fleet: Arc<FleetStore>, config: Config) -> anyhow::Result<Self> {
        let gateway = GatewayClient::new(&config.gateway_url, config.gateway_timeout())?;
        Ok(Self {
            fleet,
            gateway,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
