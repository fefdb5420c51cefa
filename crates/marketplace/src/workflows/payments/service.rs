use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::domain::{
    NewTransaction, SplitInstruction, TransactionId, TransactionStatus, TransactionType,
};
use super::gateway::{
    AutoCharge, Checkout, GatewayError, GatewayStatus, PaymentGateway, PaymentInit, SplitTerms,
    Verification,
};
use super::repository::TransactionRepository;
use crate::config::PaymentConfig;
use crate::workflows::store::RepositoryError;

static TRANSACTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_transaction_id() -> TransactionId {
    let id = TRANSACTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TransactionId(format!("txn-{id:06}"))
}

/// `PREFIX-<unix seconds>-<6 random alphanumerics>`, unique per attempt.
pub fn generate_reference(transaction_type: TransactionType, now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|byte| char::from(byte).to_ascii_uppercase())
        .collect();
    format!(
        "{}-{}-{}",
        transaction_type.reference_prefix(),
        now.timestamp(),
        suffix
    )
}

/// What a workflow asks for when it needs the payer sent to checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub transaction_type: TransactionType,
    pub email: String,
    pub amount: Decimal,
    /// Subaccount receiving the non-platform share; `None` charges the platform directly.
    pub split_subaccount: Option<String>,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub transaction: NewTransaction,
    pub checkout: Checkout,
}

/// Result of recording a provider verification against a stored transaction.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub transaction: NewTransaction,
    /// False when the transaction was already settled or is still pending.
    pub changed: bool,
}

/// Creates transactions, opens checkouts, and records provider verifications.
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    transactions: Arc<dyn TransactionRepository>,
    config: PaymentConfig,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        transactions: Arc<dyn TransactionRepository>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            gateway,
            transactions,
            config,
        }
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Platform cut for a split payment, rounded to kobo.
    pub fn platform_share(&self, amount: Decimal) -> Decimal {
        (amount * self.config.platform_share_percent / Decimal::ONE_HUNDRED).round_dp(2)
    }

    /// Persists a pending transaction and asks the provider for a checkout link.
    pub fn open_checkout(&self, request: CheckoutRequest) -> Result<PaymentSession, PaymentError> {
        let now = Utc::now();
        let reference = generate_reference(request.transaction_type, now);
        let split = request
            .split_subaccount
            .as_ref()
            .map(|subaccount| SplitInstruction {
                subaccount_code: subaccount.clone(),
                platform_share: self.platform_share(request.amount),
            });

        let transaction = self.transactions.insert(NewTransaction {
            id: next_transaction_id(),
            reference: reference.clone(),
            transaction_type: request.transaction_type,
            status: TransactionStatus::Pending,
            amount: request.amount,
            currency: "NGN".to_string(),
            email: request.email.clone(),
            split: split.clone(),
            checkout_url: None,
            authorization_code: None,
            gateway_message: None,
            version: 0,
            created_at: now,
            updated_at: now,
            settled_at: None,
        })?;

        let init = PaymentInit {
            reference: reference.clone(),
            email: request.email,
            amount: request.amount,
            callback_url: self.config.callback_url.clone(),
            metadata: request.metadata,
        };
        let attempt = match &split {
            Some(split) => self.gateway.initialize_split_payment(
                &init,
                &SplitTerms {
                    subaccount_code: split.subaccount_code.clone(),
                    platform_share: split.platform_share,
                },
            ),
            None => self.gateway.initialize_payment(&init),
        };

        match attempt {
            Ok(checkout) => {
                let version = transaction.version;
                let mut updated = transaction;
                updated.checkout_url = Some(checkout.authorization_url.clone());
                updated.updated_at = Utc::now();
                let transaction = self.transactions.update(updated, version)?;
                info!(
                    reference = %transaction.reference,
                    kind = transaction.transaction_type.label(),
                    amount = %transaction.amount,
                    split = transaction.split.is_some(),
                    "checkout opened"
                );
                Ok(PaymentSession {
                    transaction,
                    checkout,
                })
            }
            Err(err) => {
                warn!(reference = %reference, error = %err, "payment initialization failed");
                let version = transaction.version;
                let mut failed = transaction;
                mark_failed(&mut failed, err.to_string());
                if let Err(store_err) = self.transactions.update(failed, version) {
                    warn!(reference = %reference, error = %store_err, "could not mark transaction failed");
                }
                Err(PaymentError::Gateway(err))
            }
        }
    }

    pub fn find(&self, reference: &str) -> Result<NewTransaction, PaymentError> {
        self.transactions
            .by_reference(reference)?
            .ok_or_else(|| PaymentError::UnknownReference(reference.to_string()))
    }

    /// Asks the provider for the outcome of `reference` and records it.
    pub fn verify(&self, reference: &str) -> Result<Settlement, PaymentError> {
        let transaction = self.find(reference)?;
        if transaction.is_settled() {
            return Ok(Settlement {
                transaction,
                changed: false,
            });
        }

        let verification = self.gateway.verify_payment(reference)?;
        self.settle(transaction, &verification)
    }

    /// Applies a verification to a pending transaction. Settled transactions are left alone.
    pub fn settle(
        &self,
        transaction: NewTransaction,
        verification: &Verification,
    ) -> Result<Settlement, PaymentError> {
        if transaction.is_settled() || verification.status == GatewayStatus::Pending {
            return Ok(Settlement {
                transaction,
                changed: false,
            });
        }

        let version = transaction.version;
        let mut updated = transaction;
        match verification.status {
            GatewayStatus::Success if verification.amount == updated.amount => {
                let now = Utc::now();
                updated.status = TransactionStatus::Success;
                updated.authorization_code = verification.authorization_code.clone();
                updated.gateway_message = verification.message.clone();
                updated.updated_at = now;
                updated.settled_at = Some(now);
            }
            GatewayStatus::Success => {
                let message = format!(
                    "provider reported {} but {} was expected",
                    verification.amount, updated.amount
                );
                warn!(reference = %updated.reference, %message, "verified amount mismatch");
                mark_failed(&mut updated, message);
            }
            _ => {
                let message = verification
                    .message
                    .clone()
                    .unwrap_or_else(|| "payment was not completed".to_string());
                mark_failed(&mut updated, message);
            }
        }

        let transaction = self.transactions.update(updated, version)?;
        info!(
            reference = %transaction.reference,
            status = transaction.status.label(),
            "transaction settled"
        );
        Ok(Settlement {
            transaction,
            changed: true,
        })
    }

    /// Charges a stored authorization (auto-renewal) and records the outcome immediately.
    pub fn charge_authorization(
        &self,
        transaction_type: TransactionType,
        email: &str,
        amount: Decimal,
        authorization_code: &str,
    ) -> Result<NewTransaction, PaymentError> {
        let now = Utc::now();
        let reference = generate_reference(transaction_type, now);
        let transaction = self.transactions.insert(NewTransaction {
            id: next_transaction_id(),
            reference: reference.clone(),
            transaction_type,
            status: TransactionStatus::Pending,
            amount,
            currency: "NGN".to_string(),
            email: email.to_string(),
            split: None,
            checkout_url: None,
            authorization_code: Some(authorization_code.to_string()),
            gateway_message: None,
            version: 0,
            created_at: now,
            updated_at: now,
            settled_at: None,
        })?;

        let charge = AutoCharge {
            reference: reference.clone(),
            email: email.to_string(),
            amount,
            authorization_code: authorization_code.to_string(),
        };
        let verification = match self.gateway.auto_charge(&charge) {
            Ok(verification) => verification,
            Err(err) => {
                warn!(reference = %reference, error = %err, "auto charge failed");
                Verification {
                    reference,
                    status: GatewayStatus::Failed,
                    amount,
                    authorization_code: None,
                    message: Some(err.to_string()),
                }
            }
        };

        Ok(self.settle(transaction, &verification)?.transaction)
    }

    /// Marks pending transactions older than the configured TTL as failed.
    pub fn fail_stale(&self, now: DateTime<Utc>) -> Result<Vec<NewTransaction>, PaymentError> {
        let cutoff = now - Duration::hours(self.config.pending_ttl_hours);
        let mut expired = Vec::new();

        for transaction in self.transactions.pending_created_before(cutoff)? {
            let version = transaction.version;
            let mut stale = transaction;
            mark_failed(&mut stale, "checkout expired before payment".to_string());
            match self.transactions.update(stale, version) {
                Ok(updated) => expired.push(updated),
                // settled by a concurrent verification
                Err(RepositoryError::VersionMismatch { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(expired)
    }
}

fn mark_failed(transaction: &mut NewTransaction, message: String) {
    let now = Utc::now();
    transaction.status = TransactionStatus::Failed;
    transaction.gateway_message = Some(message);
    transaction.updated_at = now;
    transaction.settled_at = Some(now);
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("no transaction found for reference {0}")]
    UnknownReference(String),
}
