//! Operator notifications.
//!
//! Every state-changing fleet operation publishes exactly one of these; the
//! dashboard renders them as toasts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const NOTIFICATION_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub connection_string: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Fan-out of notifications to any number of subscribers.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn publish(
        &self,
        level: NotificationLevel,
        connection_string: &str,
        message: impl Into<String>,
    ) {
        let notification = Notification {
            level,
            message: message.into(),
            connection_string: Some(connection_string.to_string()),
            timestamp: Utc::now(),
        };
        match level {
            NotificationLevel::Error => {
                tracing::error!("[{}] {}", connection_string, notification.message)
            }
            NotificationLevel::Warning => {
                tracing::warn!("[{}] {}", connection_string, notification.message)
            }
            NotificationLevel::Success | NotificationLevel::Info => {
                tracing::info!("[{}] {}", connection_string, notification.message)
            }
        }
        // No subscribers is fine; the notification is still logged.
        let _ = self.tx.send(notification);
    }

    pub fn success(&self, connection_string: &str, message: impl Into<String>) {
        self.publish(NotificationLevel::Success, connection_string, message);
    }

    pub fn warning(&self, connection_string: &str, message: impl Into<String>) {
        self.publish(NotificationLevel::Warning, connection_string, message);
    }

    pub fn error(&self, connection_string: &str, message: impl Into<String>) {
        self.publish(NotificationLevel::Error, connection_string, message);
    }
}
