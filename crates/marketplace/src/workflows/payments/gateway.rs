//! Seam over the third-party payment provider (Paystack-shaped).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to open a hosted checkout for `amount` naira.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInit {
    pub reference: String,
    pub email: String,
    pub amount: Decimal,
    pub callback_url: String,
    pub metadata: Value,
}

/// Routes the payment to a subaccount while the platform keeps `platform_share`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitTerms {
    pub subaccount_code: String,
    pub platform_share: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub reference: String,
    pub status: GatewayStatus,
    pub amount: Decimal,
    pub authorization_code: Option<String>,
    pub message: Option<String>,
}

/// Recurring charge against a stored card authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCharge {
    pub reference: String,
    pub email: String,
    pub amount: Decimal,
    pub authorization_code: String,
}

pub trait PaymentGateway: Send + Sync {
    fn initialize_payment(&self, init: &PaymentInit) -> Result<Checkout, GatewayError>;
    fn initialize_split_payment(
        &self,
        init: &PaymentInit,
        split: &SplitTerms,
    ) -> Result<Checkout, GatewayError>;
    fn verify_payment(&self, reference: &str) -> Result<Verification, GatewayError>;
    fn auto_charge(&self, charge: &AutoCharge) -> Result<Verification, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("payment provider declined the request: {0}")]
    Declined(String),
    #[error("payment provider does not know reference {0}")]
    UnknownReference(String),
    #[error("payment provider unreachable: {0}")]
    Transport(String),
}

/// Converts naira to kobo, the unit the provider API expects.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn converts_to_kobo() {
        assert_eq!(to_minor_units(dec!(680400)), Some(68_040_000));
        assert_eq!(to_minor_units(dec!(12.345)), Some(1_234));
    }
}
