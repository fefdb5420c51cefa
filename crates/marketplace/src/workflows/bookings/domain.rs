use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pricing::ShortletQuote;
use crate::workflows::directory::{BookingMode, PartyContact, PropertyId};
use crate::workflows::http::deserialize_instant;
use crate::workflows::payments::TransactionId;
use crate::workflows::store::Versioned;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Manual-mode booking waiting on the owner.
    Requested,
    /// Waiting on payment.
    Pending,
    Confirmed,
    Cancelled,
    Unavailable,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerResponseKind {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    pub response: OwnerResponseKind,
    pub responded_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl OwnerResponse {
    pub fn pending() -> Self {
        Self {
            response: OwnerResponseKind::Pending,
            responded_at: None,
            note: None,
        }
    }
}

/// Stay details as submitted by the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(deserialize_with = "deserialize_instant")]
    pub check_in: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub check_out: DateTime<Utc>,
    pub guests: u32,
    #[serde(default)]
    pub note: Option<String>,
}

/// Channel the booking came through; deal-site bookings split the payment with the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReceiverMode {
    General,
    DealSite {
        #[serde(rename = "publicSlug")]
        public_slug: String,
    },
}

impl ReceiverMode {
    pub fn deal_site(&self) -> Option<&str> {
        match self {
            Self::General => None,
            Self::DealSite { public_slug } => Some(public_slug),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub booking_code: String,
    pub pass_code: String,
    pub property_id: PropertyId,
    pub property_title: String,
    pub buyer: PartyContact,
    pub owner: PartyContact,
    pub transaction_id: Option<TransactionId>,
    pub booking_details: BookingDetails,
    pub booking_mode: BookingMode,
    pub status: BookingStatus,
    pub owner_response: OwnerResponse,
    pub meta: ShortletQuote,
    pub receiver_mode: ReceiverMode,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Versioned for Booking {
    fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}
