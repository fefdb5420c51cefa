use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::directory::PartyContact;
use crate::workflows::payments::TransactionId;
use crate::workflows::store::Versioned;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plan terms copied onto the subscription at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSnapshot {
    pub code: String,
    pub name: String,
    pub price: Decimal,
    pub duration_days: i64,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Expired,
    Cancelled,
    Failed,
}

impl SubscriptionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub subscriber: PartyContact,
    pub plan: PlanSnapshot,
    pub status: SubscriptionStatus,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    /// Reusable card authorization captured from the first successful charge.
    pub authorization_code: Option<String>,
    /// Most recent transaction: the initial checkout or the last renewal charge.
    pub transaction_id: TransactionId,
    pub renewals: u32,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl Versioned for Subscription {
    fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}
