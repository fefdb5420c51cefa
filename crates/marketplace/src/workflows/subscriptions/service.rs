use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::domain::{Subscription, SubscriptionId, SubscriptionStatus};
use super::plans::PlanCatalog;
use super::repository::SubscriptionRepository;
use crate::workflows::directory::{PartyContact, UserId};
use crate::workflows::http::{
    repository_code, repository_status, validation_details, WorkflowError,
};
use crate::workflows::notifications::{format_naira, EmailBody, Notifier};
use crate::workflows::payments::{
    CheckoutRequest, EffectError, EffectReport, NewTransaction, PaymentError, PaymentService,
    PaymentSession, TransactionEffect, TransactionStatus, TransactionType,
};
use crate::workflows::store::RepositoryError;
use crate::workflows::validation::{FieldErrors, ValidationError};

static SUBSCRIPTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_subscription_id() -> SubscriptionId {
    let id = SUBSCRIPTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SubscriptionId(format!("sub-{id:06}"))
}

fn default_auto_renew() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub plan_code: String,
    #[serde(default = "default_auto_renew")]
    pub auto_renew: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionReceipt {
    pub subscription: Subscription,
    pub payment: PaymentSession,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalReport {
    pub renewed: usize,
    pub failed: usize,
}

/// Plan purchases, activation on payment, and the renewal/expiry sweeps.
pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<PaymentService>,
    notifier: Notifier,
    catalog: PlanCatalog,
}

impl SubscriptionService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<PaymentService>,
        notifier: Notifier,
        catalog: PlanCatalog,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            notifier,
            catalog,
        }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    pub fn get(&self, id: &SubscriptionId) -> Result<Subscription, SubscriptionError> {
        self.subscriptions
            .fetch(id)?
            .ok_or_else(|| SubscriptionError::NotFound(id.clone()))
    }

    pub fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Result<SubscriptionReceipt, SubscriptionError> {
        let mut errors = FieldErrors::new();
        errors.require_text(&request.user_id.0, "userId");
        errors.require_text(&request.full_name, "fullName");
        errors.require_email(&request.email, "email");
        errors.finish()?;

        let plan = self
            .catalog
            .find(&request.plan_code)
            .cloned()
            .ok_or_else(|| SubscriptionError::PlanNotFound(request.plan_code.clone()))?;
        let email = request.email.trim().to_ascii_lowercase();
        let payment = self.payments.open_checkout(CheckoutRequest {
            transaction_type: TransactionType::Subscription,
            email: email.clone(),
            amount: plan.price,
            split_subaccount: None,
            metadata: json!({ "plan": plan.code, "userId": request.user_id }),
        })?;

        let now = Utc::now();
        let subscription = self.subscriptions.insert(Subscription {
            id: next_subscription_id(),
            subscriber: PartyContact {
                id: request.user_id,
                full_name: request.full_name.trim().to_string(),
                email,
            },
            plan,
            status: SubscriptionStatus::Pending,
            starts_at: None,
            expires_at: None,
            auto_renew: request.auto_renew,
            authorization_code: None,
            transaction_id: payment.transaction.id.clone(),
            renewals: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        })?;

        info!(
            subscription = %subscription.id,
            plan = %subscription.plan.code,
            reference = %payment.transaction.reference,
            "subscription checkout opened"
        );
        Ok(SubscriptionReceipt {
            subscription,
            payment,
        })
    }

    pub fn cancel_auto_renew(
        &self,
        id: &SubscriptionId,
        user_id: &UserId,
    ) -> Result<Subscription, SubscriptionError> {
        let current = self.get(id)?;
        if &current.subscriber.id != user_id {
            return Err(SubscriptionError::Forbidden {
                user: user_id.clone(),
            });
        }
        if !current.auto_renew {
            return Ok(current);
        }

        let version = current.version;
        let mut next = current;
        next.auto_renew = false;
        next.updated_at = Utc::now();
        let subscription = self.subscriptions.update(next, version)?;
        info!(subscription = %subscription.id, "auto-renew cancelled");
        Ok(subscription)
    }

    /// Charges stored authorizations for lapsed auto-renewing subscriptions.
    pub fn auto_renew_due(&self, now: DateTime<Utc>) -> Result<RenewalReport, SubscriptionError> {
        let mut report = RenewalReport::default();

        for subscription in self.subscriptions.lapsed(now)? {
            let Some(authorization) = subscription.authorization_code.clone() else {
                continue;
            };
            if !subscription.auto_renew {
                continue;
            }

            let charge = self.payments.charge_authorization(
                TransactionType::Subscription,
                &subscription.subscriber.email,
                subscription.plan.price,
                &authorization,
            );
            let transaction = match charge {
                Ok(transaction) => transaction,
                Err(err) => {
                    warn!(subscription = %subscription.id, error = %err, "renewal charge errored");
                    report.failed += 1;
                    continue;
                }
            };

            let renewed = transaction.status == TransactionStatus::Success;
            let version = subscription.version;
            let mut next = subscription;
            next.transaction_id = transaction.id.clone();
            next.updated_at = now;
            if renewed {
                let period = Duration::days(next.plan.duration_days);
                let from = next.expires_at.filter(|expiry| *expiry + period > now).unwrap_or(now);
                next.expires_at = Some(from + period);
                next.renewals += 1;
            } else {
                next.auto_renew = false;
            }

            let subscription = match self.subscriptions.update(next, version) {
                Ok(subscription) => subscription,
                Err(RepositoryError::VersionMismatch { .. }) => continue,
                Err(err) => return Err(err.into()),
            };

            let subscriber = &subscription.subscriber;
            if renewed {
                report.renewed += 1;
                let expires = subscription
                    .expires_at
                    .map(|expiry| expiry.format("%d %b %Y").to_string())
                    .unwrap_or_default();
                self.notifier.email(
                    &EmailBody::new(&subscriber.full_name, "Subscription Renewed")
                        .paragraph(format!("Your {} plan was renewed.", subscription.plan.name))
                        .detail("Amount charged", format_naira(transaction.amount))
                        .detail("Valid until", expires)
                        .render(&subscriber.email, "Subscription Renewed"),
                );
            } else {
                report.failed += 1;
                self.notifier.email(
                    &EmailBody::new(&subscriber.full_name, "Subscription Renewal Failed")
                        .paragraph(format!(
                            "We could not charge your card to renew the {} plan. Auto-renew has been turned off.",
                            subscription.plan.name
                        ))
                        .render(&subscriber.email, "Subscription Renewal Failed"),
                );
            }
        }

        if report.renewed + report.failed > 0 {
            info!(renewed = report.renewed, failed = report.failed, "auto-renew sweep finished");
        }
        Ok(report)
    }

    /// Expires every active subscription whose term has lapsed.
    pub fn expire_due(&self, now: DateTime<Utc>) -> Result<usize, SubscriptionError> {
        let mut expired = 0;

        for subscription in self.subscriptions.lapsed(now)? {
            let version = subscription.version;
            let mut next = subscription;
            next.status = SubscriptionStatus::Expired;
            next.updated_at = now;
            let subscription = match self.subscriptions.update(next, version) {
                Ok(subscription) => subscription,
                Err(RepositoryError::VersionMismatch { .. }) => continue,
                Err(err) => return Err(err.into()),
            };
            expired += 1;

            let subscriber = &subscription.subscriber;
            self.notifier.email(
                &EmailBody::new(&subscriber.full_name, "Subscription Expired")
                    .paragraph(format!(
                        "Your {} plan has expired. Renew to keep your deal site online.",
                        subscription.plan.name
                    ))
                    .action("Renew now", self.notifier.client_link("dashboard/subscription"))
                    .render(&subscriber.email, "Subscription Expired"),
            );
            self.notifier.notify(
                &subscriber.id,
                "Subscription Expired",
                &format!("Your {} plan has expired", subscription.plan.name),
                json!({ "subscriptionId": subscription.id }),
            );
        }

        if expired > 0 {
            info!(expired, "subscription expiry sweep finished");
        }
        Ok(expired)
    }

    fn settle(
        &self,
        transaction: &NewTransaction,
        apply: impl FnOnce(&mut Subscription),
    ) -> Result<Option<Subscription>, EffectError> {
        let subscription = self
            .subscriptions
            .by_transaction(&transaction.id)?
            .ok_or_else(|| EffectError::Unlinked {
                kind: "subscription",
                reference: transaction.reference.clone(),
            })?;
        if subscription.status != SubscriptionStatus::Pending {
            return Ok(None);
        }

        let version = subscription.version;
        let mut next = subscription;
        apply(&mut next);
        next.updated_at = Utc::now();
        match self.subscriptions.update(next, version) {
            Ok(updated) => Ok(Some(updated)),
            Err(RepositoryError::VersionMismatch { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl TransactionEffect for SubscriptionService {
    fn on_success(&self, transaction: &NewTransaction) -> Result<EffectReport, EffectError> {
        let now = Utc::now();
        let activated = self.settle(transaction, |subscription| {
            subscription.status = SubscriptionStatus::Active;
            subscription.starts_at = Some(now);
            subscription.expires_at =
                Some(now + Duration::days(subscription.plan.duration_days));
            subscription.authorization_code = transaction.authorization_code.clone();
        })?;
        let Some(subscription) = activated else {
            return Ok(EffectReport::skipped());
        };

        let subscriber = &subscription.subscriber;
        let valid_until = subscription
            .expires_at
            .map(|expiry| expiry.format("%d %b %Y").to_string())
            .unwrap_or_default();
        let sent = self.notifier.email(
            &EmailBody::new(&subscriber.full_name, "Subscription Activated")
                .paragraph(format!("Your {} plan is now active.", subscription.plan.name))
                .detail("Amount paid", format_naira(transaction.amount))
                .detail("Valid until", valid_until)
                .render(&subscriber.email, "Subscription Activated"),
        );
        let notified = self.notifier.notify(
            &subscriber.id,
            "Subscription Activated",
            &format!("Your {} plan is active", subscription.plan.name),
            json!({ "subscriptionId": subscription.id }),
        );

        Ok(EffectReport {
            applied: true,
            records: 1,
            emails_sent: usize::from(sent),
            notifications_sent: usize::from(notified),
        })
    }

    fn on_failure(&self, transaction: &NewTransaction) -> Result<EffectReport, EffectError> {
        let failed = self.settle(transaction, |subscription| {
            subscription.status = SubscriptionStatus::Failed;
        })?;
        let Some(subscription) = failed else {
            return Ok(EffectReport::skipped());
        };

        let subscriber = &subscription.subscriber;
        let sent = self.notifier.email(
            &EmailBody::new(&subscriber.full_name, "Subscription Payment Failed")
                .paragraph(format!(
                    "We could not confirm payment for the {} plan.",
                    subscription.plan.name
                ))
                .detail("Reference", transaction.reference.clone())
                .render(&subscriber.email, "Subscription Payment Failed"),
        );

        Ok(EffectReport {
            applied: true,
            records: 1,
            emails_sent: usize::from(sent),
            notifications_sent: 0,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("plan '{0}' does not exist")]
    PlanNotFound(String),
    #[error("subscription {0} was not found")]
    NotFound(SubscriptionId),
    #[error("user {} does not own this subscription", .user.0)]
    Forbidden { user: UserId },
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError for SubscriptionError {
    fn status(&self) -> StatusCode {
        match self {
            SubscriptionError::Validation(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::PlanNotFound(_) | SubscriptionError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            SubscriptionError::Forbidden { .. } => StatusCode::FORBIDDEN,
            SubscriptionError::Payment(PaymentError::Gateway(_)) => StatusCode::BAD_GATEWAY,
            SubscriptionError::Payment(PaymentError::Repository(err))
            | SubscriptionError::Repository(err) => repository_status(err),
            SubscriptionError::Payment(PaymentError::UnknownReference(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SubscriptionError::Validation(_) => "VALIDATION_ERROR",
            SubscriptionError::PlanNotFound(_) => "PLAN_NOT_FOUND",
            SubscriptionError::NotFound(_) => "SUBSCRIPTION_NOT_FOUND",
            SubscriptionError::Forbidden { .. } => "FORBIDDEN",
            SubscriptionError::Payment(PaymentError::Gateway(_)) => "PAYMENT_PROVIDER_ERROR",
            SubscriptionError::Payment(PaymentError::Repository(err))
            | SubscriptionError::Repository(err) => repository_code(err),
            SubscriptionError::Payment(PaymentError::UnknownReference(_)) => {
                "TRANSACTION_NOT_FOUND"
            }
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            SubscriptionError::Validation(err) => Some(validation_details(err)),
            _ => None,
        }
    }
}
