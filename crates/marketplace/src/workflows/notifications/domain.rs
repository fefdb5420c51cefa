use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflows::directory::UserId;

/// Rendered email handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// In-app notification shown on the recipient's dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InAppNotification {
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}

/// Outbound email transport (SMTP or an HTTP mail API).
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}

/// Destination for in-app notifications.
pub trait NotificationSink: Send + Sync {
    fn push(&self, notification: InAppNotification) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("recipient rejected: {0}")]
    Rejected(String),
    #[error("delivery transport unavailable: {0}")]
    Transport(String),
}
