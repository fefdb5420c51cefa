use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{NewTransaction, TransactionStatus, TransactionType};
use super::service::{PaymentError, PaymentService};
use crate::workflows::store::RepositoryError;

/// Domain side effects run once a transaction of a given type settles.
///
/// Implementations must guard on their own pending status so that replaying a
/// settled transaction is a no-op.
pub trait TransactionEffect: Send + Sync {
    fn on_success(&self, transaction: &NewTransaction) -> Result<EffectReport, EffectError>;
    fn on_failure(&self, transaction: &NewTransaction) -> Result<EffectReport, EffectError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectReport {
    /// False when the guard found nothing left to do.
    pub applied: bool,
    pub records: usize,
    pub emails_sent: usize,
    pub notifications_sent: usize,
}

impl EffectReport {
    pub fn skipped() -> Self {
        Self::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("no {kind} record references transaction {reference}")]
    Unlinked {
        kind: &'static str,
        reference: String,
    },
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// Outcome of a verification call, including the effect run (if any).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub transaction: NewTransaction,
    pub effect: Option<EffectReport>,
}

/// Routes settled transactions to exactly one registered effect by type.
pub struct PaymentEffectDispatcher {
    payments: Arc<PaymentService>,
    effects: HashMap<TransactionType, Arc<dyn TransactionEffect>>,
}

impl PaymentEffectDispatcher {
    pub fn new(payments: Arc<PaymentService>) -> Self {
        Self {
            payments,
            effects: HashMap::new(),
        }
    }

    pub fn register(
        mut self,
        transaction_type: TransactionType,
        effect: Arc<dyn TransactionEffect>,
    ) -> Self {
        self.effects.insert(transaction_type, effect);
        self
    }

    pub fn payments(&self) -> &Arc<PaymentService> {
        &self.payments
    }

    /// Verifies `reference` with the provider and runs the matching effect once settled.
    pub fn verify(&self, reference: &str) -> Result<VerificationOutcome, DispatchError> {
        let settlement = self.payments.verify(reference)?;
        let transaction = settlement.transaction;

        if !transaction.is_settled() {
            info!(reference, "transaction still pending; no effects dispatched");
            return Ok(VerificationOutcome {
                transaction,
                effect: None,
            });
        }

        let report = self.dispatch(&transaction)?;
        Ok(VerificationOutcome {
            transaction,
            effect: Some(report),
        })
    }

    pub fn dispatch(&self, transaction: &NewTransaction) -> Result<EffectReport, DispatchError> {
        let effect = self
            .effects
            .get(&transaction.transaction_type)
            .ok_or(DispatchError::Unhandled(transaction.transaction_type))?;

        let result = match transaction.status {
            TransactionStatus::Success => effect.on_success(transaction),
            TransactionStatus::Failed => effect.on_failure(transaction),
            TransactionStatus::Pending => return Ok(EffectReport::skipped()),
        };

        match result {
            Ok(report) => {
                info!(
                    reference = %transaction.reference,
                    kind = transaction.transaction_type.label(),
                    status = transaction.status.label(),
                    applied = report.applied,
                    emails = report.emails_sent,
                    "payment effects dispatched"
                );
                Ok(report)
            }
            Err(err) => {
                warn!(
                    reference = %transaction.reference,
                    kind = transaction.transaction_type.label(),
                    error = %err,
                    "payment effect failed"
                );
                Err(err.into())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Effect(#[from] EffectError),
    #[error("no effect registered for {} transactions", .0.label())]
    Unhandled(TransactionType),
}
