use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::activity::SenderRole;
use crate::workflows::directory::{PartyContact, PropertyId};
use crate::workflows::payments::TransactionId;
use crate::workflows::store::Versioned;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InspectionId(pub String);

impl fmt::Display for InspectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the buyer is negotiating with: a price offer or a letter of intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InspectionType {
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "LOI")]
    Loi,
}

impl InspectionType {
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Price => "Offer",
            Self::Loi => "Letter of Intent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Inspection,
    Negotiation,
    Completed,
    Cancelled,
}

impl Stage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inspection => "inspection",
            Self::Negotiation => "negotiation",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Kept as in the legacy API: `countered` also marks accept/reject actions that moved the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    Accepted,
    Countered,
}

/// Party whose response the negotiation is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Buyer,
    Seller,
    Admin,
}

impl Party {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

/// Side taking a negotiation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Buyer,
    Seller,
}

impl UserType {
    pub const fn party(self) -> Party {
        match self {
            Self::Buyer => Party::Buyer,
            Self::Seller => Party::Seller,
        }
    }

    pub const fn counterpart(self) -> Self {
        match self {
            Self::Buyer => Self::Seller,
            Self::Seller => Self::Buyer,
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Buyer => "Buyer",
            Self::Seller => "Seller",
        }
    }

    pub const fn sender_role(self) -> SenderRole {
        match self {
            Self::Buyer => SenderRole::Buyer,
            Self::Seller => SenderRole::Seller,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionMode {
    #[default]
    InPerson,
    Virtual,
}

impl InspectionMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::InPerson => "in person",
            Self::Virtual => "virtual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegotiationAction {
    Accept,
    Reject,
    Counter,
}

impl NegotiationAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Counter => "counter",
        }
    }
}

/// Outcome tag stored on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionRecordStatus {
    PendingTransaction,
    TransactionFailed,
    ActiveNegotiation,
    AwaitingSeller,
    NegotiationAccepted,
    NegotiationRejected,
    NegotiationCountered,
    Completed,
    Cancelled,
}

impl InspectionRecordStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingTransaction => "pending_transaction",
            Self::TransactionFailed => "transaction_failed",
            Self::ActiveNegotiation => "active_negotiation",
            Self::AwaitingSeller => "awaiting_seller",
            Self::NegotiationAccepted => "negotiation_accepted",
            Self::NegotiationRejected => "negotiation_rejected",
            Self::NegotiationCountered => "negotiation_countered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Aggregate root for one property inspection and its negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionBooking {
    pub id: InspectionId,
    pub property_id: PropertyId,
    pub property_title: String,
    pub deal_site_slug: Option<String>,
    pub requester: PartyContact,
    pub owner: PartyContact,
    pub transaction_id: TransactionId,
    pub inspection_type: InspectionType,
    pub negotiation_price: Option<Decimal>,
    pub letter_of_intention: Option<String>,
    pub is_negotiating: bool,
    #[serde(rename = "isLOI")]
    pub is_loi: bool,
    pub counter_count: u32,
    pub status: InspectionRecordStatus,
    pub stage: Stage,
    pub inspection_status: Option<InspectionStatus>,
    pub pending_response_from: Party,
    pub inspection_mode: InspectionMode,
    pub inspection_date: NaiveDate,
    pub inspection_time: String,
    /// Whether the most recent action moved the date, time, or mode.
    pub schedule_revised: bool,
    pub reason: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Versioned for InspectionBooking {
    fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}
