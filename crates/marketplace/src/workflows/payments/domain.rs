use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::store::Versioned;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

/// Tag used to route a verified transaction to its domain side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionType {
    Inspection,
    ShortletBooking,
    DocumentVerification,
    Subscription,
}

impl TransactionType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inspection => "inspection",
            Self::ShortletBooking => "shortlet-booking",
            Self::DocumentVerification => "document-verification",
            Self::Subscription => "subscription",
        }
    }

    /// Prefix used in generated payment references.
    pub const fn reference_prefix(self) -> &'static str {
        match self {
            Self::Inspection => "INS",
            Self::ShortletBooking => "BKG",
            Self::DocumentVerification => "DOC",
            Self::Subscription => "SUB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Revenue split applied when a deal site receives the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitInstruction {
    pub subaccount_code: String,
    /// Flat amount retained by the platform.
    pub platform_share: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub id: TransactionId,
    pub reference: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub currency: String,
    pub email: String,
    pub split: Option<SplitInstruction>,
    pub checkout_url: Option<String>,
    /// Reusable card authorization captured on a successful charge.
    pub authorization_code: Option<String>,
    pub gateway_message: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl NewTransaction {
    pub fn is_settled(&self) -> bool {
        self.status != TransactionStatus::Pending
    }
}

impl Versioned for NewTransaction {
    fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}
