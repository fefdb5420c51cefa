use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for listed properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub String);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for buyers, owners, and agents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Shortlet,
    Rent,
    Sale,
    JointVenture,
}

impl PropertyType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shortlet => "shortlet",
            Self::Rent => "rent",
            Self::Sale => "sale",
            Self::JointVenture => "joint_venture",
        }
    }
}

/// Whether a shortlet booking is charged immediately or waits for the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingMode {
    #[default]
    Instant,
    Manual,
}

/// Optional per-night pricing; the flat price stands in for the nightly rate when absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortletTerms {
    pub nightly_rate: Option<Decimal>,
    pub weekly_discount_percent: Decimal,
    pub monthly_discount_percent: Decimal,
    pub cleaning_fee: Decimal,
    pub security_deposit: Decimal,
    pub booking_mode: BookingMode,
}

/// Name and email snapshot copied onto workflow records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyContact {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    pub title: String,
    pub location: String,
    pub property_type: PropertyType,
    pub price: Decimal,
    pub inspection_fee: Decimal,
    pub shortlet: ShortletTerms,
    pub is_available: bool,
    pub owner: PartyContact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealSiteStatus {
    Running,
    Paused,
    OnHold,
}

impl DealSiteStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::OnHold => "on_hold",
        }
    }
}

/// Agent-branded storefront that receives bookings and inspection requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealSite {
    pub public_slug: String,
    pub title: String,
    pub owner: PartyContact,
    pub status: DealSiteStatus,
    /// Provider subaccount receiving the agent's share of split payments.
    pub subaccount_code: Option<String>,
}

/// Contact details submitted by an unauthenticated buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerContact {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl Buyer {
    pub fn contact(&self) -> PartyContact {
        PartyContact {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
        }
    }
}
