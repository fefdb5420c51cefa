use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::directory::PartyContact;
use crate::workflows::payments::TransactionId;
use crate::workflows::store::Versioned;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentVerificationId(pub String);

impl fmt::Display for DocumentVerificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    PendingPayment,
    PaymentFailed,
    AwaitingReview,
    Verified,
    Rejected,
}

impl DocumentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::PaymentFailed => "payment_failed",
            Self::AwaitingReview => "awaiting_review",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

/// Uploaded title document, survey plan, or similar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVerification {
    pub id: DocumentVerificationId,
    pub requester: PartyContact,
    pub documents: Vec<DocumentReference>,
    pub fee: Decimal,
    pub transaction_id: TransactionId,
    pub status: DocumentStatus,
    pub reviewer_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Versioned for DocumentVerification {
    fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}
