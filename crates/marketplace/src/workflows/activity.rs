//! Append-only audit trail for inspection and booking transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::directory::UserId;
use super::store::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub String);

/// Aggregate the entry belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ActivitySubject {
    Inspection(String),
    Booking(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Buyer,
    Seller,
    Admin,
    System,
}

impl SenderRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }
}

/// Entry as submitted by a workflow; the log assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub subject: ActivitySubject,
    pub sender_id: Option<UserId>,
    pub sender_role: SenderRole,
    pub message: String,
    pub status: String,
    pub stage: Option<String>,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: ActivityId,
    pub subject: ActivitySubject,
    pub sender_id: Option<UserId>,
    pub sender_role: SenderRole,
    pub message: String,
    pub status: String,
    pub stage: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Storage seam for the audit trail. Entries are never updated or removed.
pub trait ActivityLog: Send + Sync {
    fn append(&self, entry: NewActivity) -> Result<ActivityLogEntry, RepositoryError>;
    fn for_subject(&self, subject: &ActivitySubject)
        -> Result<Vec<ActivityLogEntry>, RepositoryError>;
}

/// Appends an entry, logging instead of failing the caller's transition.
pub fn record(log: &dyn ActivityLog, entry: NewActivity) -> bool {
    let subject = entry.subject.clone();
    match log.append(entry) {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(?subject, error = %err, "failed to append activity log entry");
            false
        }
    }
}
