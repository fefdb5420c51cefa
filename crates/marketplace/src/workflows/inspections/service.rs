use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::domain::{
    InspectionBooking, InspectionId, InspectionMode, InspectionRecordStatus, InspectionType,
    NegotiationAction, Party, Stage, UserType,
};
use super::emails;
use super::negotiation::{self, NegotiationRequest};
use super::repository::InspectionRepository;
use super::transitions::{self, TransitionRefusal};
use crate::workflows::activity::{self, ActivityLog, ActivitySubject, NewActivity, SenderRole};
use crate::workflows::directory::{
    available_property, ensure_amount, running_deal_site, AmountMismatch, BuyerContact,
    DirectoryRepository, ListingError, PartyContact, PropertyId, UserId,
};
use crate::workflows::http::{
    deserialize_date, repository_code, repository_status, validation_details, WorkflowError,
};
use crate::workflows::notifications::Notifier;
use crate::workflows::payments::{
    CheckoutRequest, EffectError, EffectReport, GatewayError, NewTransaction, PaymentError,
    PaymentService, PaymentSession, TransactionEffect, TransactionType,
};
use crate::workflows::store::RepositoryError;
use crate::workflows::validation::{FieldErrors, ValidationError};

static INSPECTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_inspection_id() -> InspectionId {
    let id = INSPECTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InspectionId(format!("insp-{id:06}"))
}

/// One property in a batch inspection request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySelection {
    pub property_id: PropertyId,
    #[serde(default)]
    pub negotiation_price: Option<Decimal>,
    #[serde(default)]
    pub letter_of_intention: Option<String>,
}

/// Body of `POST /deal-sites/:public_slug/request-inspection`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionSubmission {
    pub requester: BuyerContact,
    pub properties: Vec<PropertySelection>,
    #[serde(deserialize_with = "deserialize_date")]
    pub inspection_date: NaiveDate,
    pub inspection_time: String,
    #[serde(default)]
    pub inspection_mode: InspectionMode,
    pub amount_to_be_paid: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionReceipt {
    pub inspections: Vec<InspectionBooking>,
    pub payment: PaymentSession,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReceipt {
    pub inspection: InspectionBooking,
    pub emails_sent: bool,
    pub log_created: bool,
    pub notification_sent: bool,
}

/// Body of `POST /inspections/:inspection_id/cancel`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub user_type: UserType,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Inspection request intake, negotiation actions, and payment effects.
pub struct InspectionService {
    directory: Arc<dyn DirectoryRepository>,
    inspections: Arc<dyn InspectionRepository>,
    activity: Arc<dyn ActivityLog>,
    payments: Arc<PaymentService>,
    notifier: Notifier,
}

impl InspectionService {
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        inspections: Arc<dyn InspectionRepository>,
        activity: Arc<dyn ActivityLog>,
        payments: Arc<PaymentService>,
        notifier: Notifier,
    ) -> Self {
        Self {
            directory,
            inspections,
            activity,
            payments,
            notifier,
        }
    }

    pub fn get(&self, id: &InspectionId) -> Result<InspectionBooking, InspectionError> {
        self.inspections
            .fetch(id)?
            .ok_or_else(|| InspectionError::NotFound(id.clone()))
    }

    /// Creates one pending record per property, all sharing a single checkout.
    pub fn submit_request(
        &self,
        public_slug: &str,
        submission: InspectionSubmission,
    ) -> Result<InspectionReceipt, InspectionError> {
        validate_submission(&submission)?;
        let site = running_deal_site(self.directory.as_ref(), public_slug)?;

        let mut properties = Vec::with_capacity(submission.properties.len());
        for selection in &submission.properties {
            let property = available_property(self.directory.as_ref(), &selection.property_id)?;
            properties.push((property, selection));
        }

        let expected: Decimal = properties
            .iter()
            .map(|(property, _)| property.inspection_fee)
            .sum();
        ensure_amount(expected, submission.amount_to_be_paid)?;

        let buyer = self.directory.upsert_buyer(&submission.requester)?;
        let payment = self.payments.open_checkout(CheckoutRequest {
            transaction_type: TransactionType::Inspection,
            email: buyer.email.clone(),
            amount: expected,
            split_subaccount: site.subaccount_code.clone(),
            metadata: json!({
                "dealSite": site.public_slug,
                "buyerId": buyer.id,
                "properties": properties
                    .iter()
                    .map(|(property, _)| property.id.0.clone())
                    .collect::<Vec<_>>(),
            }),
        })?;

        let now = Utc::now();
        let requester = buyer.contact();
        let mut inspections = Vec::with_capacity(properties.len());
        for (property, selection) in properties {
            let letter = selection
                .letter_of_intention
                .as_deref()
                .map(str::trim)
                .filter(|letter| !letter.is_empty())
                .map(str::to_string);
            let inspection_type = if letter.is_some() {
                InspectionType::Loi
            } else {
                InspectionType::Price
            };
            let is_negotiating = selection.negotiation_price.is_some() || letter.is_some();

            let inspection = self.inspections.insert(InspectionBooking {
                id: next_inspection_id(),
                property_id: property.id.clone(),
                property_title: property.title.clone(),
                deal_site_slug: Some(site.public_slug.clone()),
                requester: requester.clone(),
                owner: property.owner.clone(),
                transaction_id: payment.transaction.id.clone(),
                inspection_type,
                negotiation_price: selection.negotiation_price,
                is_loi: letter.is_some(),
                letter_of_intention: letter,
                is_negotiating,
                counter_count: 0,
                status: InspectionRecordStatus::PendingTransaction,
                stage: Stage::Inspection,
                inspection_status: None,
                pending_response_from: Party::Admin,
                inspection_mode: submission.inspection_mode,
                inspection_date: submission.inspection_date,
                inspection_time: submission.inspection_time.trim().to_string(),
                schedule_revised: false,
                reason: None,
                version: 0,
                created_at: now,
                updated_at: now,
            })?;

            activity::record(
                self.activity.as_ref(),
                NewActivity {
                    subject: ActivitySubject::Inspection(inspection.id.0.clone()),
                    sender_id: Some(requester.id.clone()),
                    sender_role: SenderRole::Buyer,
                    message: format!(
                        "{} requested an inspection of {}",
                        requester.full_name, inspection.property_title
                    ),
                    status: inspection.status.label().to_string(),
                    stage: Some(inspection.stage.label().to_string()),
                    metadata: json!({ "reference": payment.transaction.reference }),
                },
            );
            inspections.push(inspection);
        }

        info!(
            deal_site = %site.public_slug,
            reference = %payment.transaction.reference,
            count = inspections.len(),
            "inspection request submitted"
        );
        Ok(InspectionReceipt {
            inspections,
            payment,
        })
    }

    /// Validates, authorizes, and applies an accept/reject/counter action.
    pub fn apply_action(
        &self,
        id: &InspectionId,
        user_id: &UserId,
        request: NegotiationRequest,
    ) -> Result<ActionReceipt, InspectionError> {
        validate_action(&request)?;
        let current = self.get(id)?;
        if request.inspection_type != current.inspection_type {
            return Err(ValidationError::single(
                "inspectionType",
                format!(
                    "inspection was requested as {}",
                    current.inspection_type.noun().to_lowercase()
                ),
            )
            .into());
        }
        authorize(&current, user_id, request.user_type)?;
        if request.action == NegotiationAction::Counter
            && !negotiation::counter_changes_terms(&current, &request)
        {
            return Err(ValidationError::single(
                "action",
                "a counter must change the price, the letter, or the schedule",
            )
            .into());
        }

        let transition = transitions::resolve(
            current.stage,
            request.action,
            request.user_type,
            current.pending_response_from,
        )?;
        let outcome = negotiation::apply_action(&current, &request, &transition);

        let version = current.version;
        let mut next = current;
        outcome.update.clone().apply(&mut next);
        next.updated_at = Utc::now();
        let inspection = self.inspections.update(next, version)?;

        let log_created = activity::record(
            self.activity.as_ref(),
            NewActivity {
                subject: ActivitySubject::Inspection(inspection.id.0.clone()),
                sender_id: Some(user_id.clone()),
                sender_role: request.user_type.sender_role(),
                message: outcome.log_message.clone(),
                status: inspection.status.label().to_string(),
                stage: Some(inspection.stage.label().to_string()),
                metadata: json!({
                    "action": request.action,
                    "counterCount": inspection.counter_count,
                    "scheduleRevised": inspection.schedule_revised,
                }),
            },
        );

        let recipient = counterparty(&inspection, request.user_type);
        let link = self
            .notifier
            .client_link(&format!("inspections/{}", inspection.id));
        let emails_sent = self.notifier.email(&emails::negotiation_update(
            recipient,
            &outcome.email_subject,
            &outcome.email_data,
            &link,
        ));
        let notification_sent = self.notifier.notify(
            &recipient.id,
            &outcome.email_subject,
            &outcome.log_message,
            json!({ "inspectionId": inspection.id, "action": request.action }),
        );

        info!(
            inspection = %inspection.id,
            action = request.action.label(),
            stage = inspection.stage.label(),
            pending = inspection.pending_response_from.label(),
            "negotiation action applied"
        );
        Ok(ActionReceipt {
            inspection,
            emails_sent,
            log_created,
            notification_sent,
        })
    }

    /// Admin marks a confirmed inspection as held.
    pub fn complete(&self, id: &InspectionId) -> Result<ActionReceipt, InspectionError> {
        let current = self.get(id)?;
        if current.stage.is_terminal() {
            return Err(TransitionRefusal::Closed(current.stage).into());
        }
        if current.pending_response_from == Party::Admin {
            return Err(TransitionRefusal::PaymentPending.into());
        }
        if current.stage != Stage::Inspection {
            return Err(InspectionError::NegotiationInProgress(current.id));
        }

        let version = current.version;
        let mut next = current;
        next.stage = Stage::Completed;
        next.status = InspectionRecordStatus::Completed;
        next.updated_at = Utc::now();
        let inspection = self.inspections.update(next, version)?;

        let log_created = activity::record(
            self.activity.as_ref(),
            NewActivity {
                subject: ActivitySubject::Inspection(inspection.id.0.clone()),
                sender_id: None,
                sender_role: SenderRole::Admin,
                message: "Inspection marked as completed".to_string(),
                status: inspection.status.label().to_string(),
                stage: Some(inspection.stage.label().to_string()),
                metadata: Value::Null,
            },
        );
        let sent = self.notifier.email_all(&[
            emails::inspection_completed(&inspection.requester, &inspection),
            emails::inspection_completed(&inspection.owner, &inspection),
        ]);
        let notification_sent = self.notifier.notify(
            &inspection.requester.id,
            "Inspection Completed",
            &format!("Your inspection of {} is complete", inspection.property_title),
            json!({ "inspectionId": inspection.id }),
        );

        Ok(ActionReceipt {
            inspection,
            emails_sent: sent == 2,
            log_created,
            notification_sent,
        })
    }

    /// Either party may withdraw while the inspection is still open.
    pub fn cancel(
        &self,
        id: &InspectionId,
        user_id: &UserId,
        request: CancelRequest,
    ) -> Result<ActionReceipt, InspectionError> {
        let current = self.get(id)?;
        authorize(&current, user_id, request.user_type)?;
        if current.stage.is_terminal() {
            return Err(TransitionRefusal::Closed(current.stage).into());
        }

        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string);
        let version = current.version;
        let mut next = current;
        next.stage = Stage::Cancelled;
        next.status = InspectionRecordStatus::Cancelled;
        if reason.is_some() {
            next.reason = reason.clone();
        }
        next.updated_at = Utc::now();
        let inspection = self.inspections.update(next, version)?;

        let actor = request.user_type.title();
        let log_created = activity::record(
            self.activity.as_ref(),
            NewActivity {
                subject: ActivitySubject::Inspection(inspection.id.0.clone()),
                sender_id: Some(user_id.clone()),
                sender_role: request.user_type.sender_role(),
                message: format!("{actor} cancelled the inspection"),
                status: inspection.status.label().to_string(),
                stage: Some(inspection.stage.label().to_string()),
                metadata: json!({ "reason": reason }),
            },
        );
        let recipient = counterparty(&inspection, request.user_type);
        let emails_sent = self.notifier.email(&emails::inspection_cancelled(
            recipient,
            &inspection,
            &actor.to_lowercase(),
            reason.as_deref(),
        ));
        let notification_sent = self.notifier.notify(
            &recipient.id,
            "Inspection Cancelled",
            &format!("The inspection of {} was cancelled", inspection.property_title),
            json!({ "inspectionId": inspection.id }),
        );

        Ok(ActionReceipt {
            inspection,
            emails_sent,
            log_created,
            notification_sent,
        })
    }

    fn linked(&self, transaction: &NewTransaction) -> Result<Vec<InspectionBooking>, EffectError> {
        let linked = self.inspections.by_transaction(&transaction.id)?;
        if linked.is_empty() {
            return Err(EffectError::Unlinked {
                kind: "inspection",
                reference: transaction.reference.clone(),
            });
        }
        Ok(linked)
    }

    /// Applies `mutate` to every record still awaiting payment; others are left alone.
    fn settle_pending<F>(
        &self,
        linked: Vec<InspectionBooking>,
        mutate: F,
    ) -> Result<Vec<InspectionBooking>, EffectError>
    where
        F: Fn(&mut InspectionBooking),
    {
        let mut settled = Vec::new();
        for inspection in linked {
            if inspection.status != InspectionRecordStatus::PendingTransaction {
                continue;
            }
            let version = inspection.version;
            let mut next = inspection;
            mutate(&mut next);
            next.updated_at = Utc::now();
            match self.inspections.update(next, version) {
                Ok(updated) => settled.push(updated),
                Err(RepositoryError::VersionMismatch { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(settled)
    }

    fn log_system(&self, inspection: &InspectionBooking, message: &str, reference: &str) -> bool {
        activity::record(
            self.activity.as_ref(),
            NewActivity {
                subject: ActivitySubject::Inspection(inspection.id.0.clone()),
                sender_id: None,
                sender_role: SenderRole::System,
                message: message.to_string(),
                status: inspection.status.label().to_string(),
                stage: Some(inspection.stage.label().to_string()),
                metadata: json!({ "reference": reference }),
            },
        )
    }
}

impl TransactionEffect for InspectionService {
    fn on_success(&self, transaction: &NewTransaction) -> Result<EffectReport, EffectError> {
        let settled = self.settle_pending(self.linked(transaction)?, |inspection| {
            inspection.pending_response_from = Party::Seller;
            if inspection.is_negotiating {
                inspection.stage = Stage::Negotiation;
                inspection.status = InspectionRecordStatus::ActiveNegotiation;
            } else {
                inspection.stage = Stage::Inspection;
                inspection.status = InspectionRecordStatus::AwaitingSeller;
            }
        })?;
        if settled.is_empty() {
            return Ok(EffectReport::skipped());
        }

        for inspection in &settled {
            self.log_system(inspection, "Inspection payment confirmed", &transaction.reference);
        }

        let mut by_owner: Vec<(&PartyContact, Vec<&InspectionBooking>)> = Vec::new();
        for inspection in &settled {
            match by_owner
                .iter_mut()
                .find(|(owner, _)| owner.id == inspection.owner.id)
            {
                Some((_, group)) => group.push(inspection),
                None => by_owner.push((&inspection.owner, vec![inspection])),
            }
        }

        let buyer = &settled[0].requester;
        let link = self.notifier.client_link("dashboard/inspections");
        let mut messages = Vec::with_capacity(by_owner.len() + 1);
        for (owner, group) in &by_owner {
            messages.push(emails::seller_new_request(owner, buyer, group, &link));
        }
        messages.push(emails::buyer_payment_confirmed(
            buyer,
            &settled,
            transaction.amount,
            &transaction.reference,
        ));
        let emails_sent = self.notifier.email_all(&messages);

        let mut notifications_sent = 0;
        for (owner, group) in &by_owner {
            let sent = self.notifier.notify(
                &owner.id,
                "New Inspection Request",
                &format!("{} requested {} inspection(s)", buyer.full_name, group.len()),
                json!({ "reference": transaction.reference }),
            );
            notifications_sent += usize::from(sent);
        }
        let sent = self.notifier.notify(
            &buyer.id,
            "Inspection Request Confirmed",
            "Your inspection payment was confirmed",
            json!({ "reference": transaction.reference }),
        );
        notifications_sent += usize::from(sent);

        info!(
            reference = %transaction.reference,
            inspections = settled.len(),
            owners = by_owner.len(),
            "inspection payment applied"
        );
        Ok(EffectReport {
            applied: true,
            records: settled.len(),
            emails_sent,
            notifications_sent,
        })
    }

    fn on_failure(&self, transaction: &NewTransaction) -> Result<EffectReport, EffectError> {
        let failed = self.settle_pending(self.linked(transaction)?, |inspection| {
            inspection.status = InspectionRecordStatus::TransactionFailed;
            inspection.stage = Stage::Cancelled;
        })?;
        if failed.is_empty() {
            return Ok(EffectReport::skipped());
        }

        let mut emails_sent = 0;
        for inspection in &failed {
            self.log_system(inspection, "Inspection payment failed", &transaction.reference);
            if self
                .notifier
                .email(&emails::buyer_payment_failed(inspection, &transaction.reference))
            {
                emails_sent += 1;
            }
        }

        warn!(
            reference = %transaction.reference,
            inspections = failed.len(),
            "inspection payment failed"
        );
        Ok(EffectReport {
            applied: true,
            records: failed.len(),
            emails_sent,
            notifications_sent: 0,
        })
    }
}

fn counterparty(inspection: &InspectionBooking, actor: UserType) -> &PartyContact {
    match actor {
        UserType::Buyer => &inspection.owner,
        UserType::Seller => &inspection.requester,
    }
}

fn authorize(
    inspection: &InspectionBooking,
    user_id: &UserId,
    user_type: UserType,
) -> Result<(), InspectionError> {
    let party = match user_type {
        UserType::Buyer => &inspection.requester,
        UserType::Seller => &inspection.owner,
    };
    if &party.id == user_id {
        Ok(())
    } else {
        Err(InspectionError::Forbidden {
            user: user_id.clone(),
            user_type,
        })
    }
}

fn validate_submission(submission: &InspectionSubmission) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::new();
    errors.require_text(&submission.requester.full_name, "requester.fullName");
    errors.require_email(&submission.requester.email, "requester.email");
    errors.require_text(&submission.inspection_time, "inspectionTime");
    errors.ensure(
        !submission.properties.is_empty(),
        "properties",
        "at least one property is required",
    );
    errors.ensure(
        submission.amount_to_be_paid >= Decimal::ZERO,
        "amountToBePaid",
        "amountToBePaid cannot be negative",
    );

    for (index, selection) in submission.properties.iter().enumerate() {
        let duplicate = submission.properties[..index]
            .iter()
            .any(|earlier| earlier.property_id == selection.property_id);
        errors.ensure(
            !duplicate,
            format!("properties[{index}].propertyId"),
            "property listed more than once",
        );
        errors.ensure(
            selection
                .negotiation_price
                .map_or(true, |price| price > Decimal::ZERO),
            format!("properties[{index}].negotiationPrice"),
            "negotiationPrice must be greater than zero",
        );
        errors.ensure(
            !(selection.negotiation_price.is_some() && selection.letter_of_intention.is_some()),
            format!("properties[{index}]"),
            "send either a negotiationPrice or a letterOfIntention, not both",
        );
    }

    errors.finish()
}

fn validate_action(request: &NegotiationRequest) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::new();
    if let Some(price) = request.counter_price {
        errors.ensure(
            price > Decimal::ZERO,
            "counterPrice",
            "counterPrice must be greater than zero",
        );
    }
    if let Some(time) = &request.inspection_time {
        errors.require_text(time, "inspectionTime");
    }
    if request.action == NegotiationAction::Counter {
        let proposes_something = request.counter_price.is_some()
            || request.letter_of_intention.is_some()
            || request.inspection_date.is_some()
            || request.inspection_time.is_some()
            || request.inspection_mode.is_some();
        errors.ensure(
            proposes_something,
            "action",
            "a counter must propose a price, a letter, or a new schedule",
        );
    }
    errors.finish()
}

#[derive(Debug, thiserror::Error)]
pub enum InspectionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error(transparent)]
    AmountMismatch(#[from] AmountMismatch),
    #[error("inspection {0} was not found")]
    NotFound(InspectionId),
    #[error("user {} is not the {} on this inspection", .user.0, .user_type.title().to_lowercase())]
    Forbidden { user: UserId, user_type: UserType },
    #[error(transparent)]
    Transition(#[from] TransitionRefusal),
    #[error("inspection {0} is still being negotiated")]
    NegotiationInProgress(InspectionId),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError for InspectionError {
    fn status(&self) -> StatusCode {
        match self {
            InspectionError::Validation(_)
            | InspectionError::AmountMismatch(_)
            | InspectionError::Transition(_)
            | InspectionError::NegotiationInProgress(_) => StatusCode::BAD_REQUEST,
            InspectionError::Listing(err) => err.status(),
            InspectionError::NotFound(_) => StatusCode::NOT_FOUND,
            InspectionError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InspectionError::Payment(PaymentError::Gateway(_)) => StatusCode::BAD_GATEWAY,
            InspectionError::Payment(PaymentError::Repository(err))
            | InspectionError::Repository(err) => repository_status(err),
            InspectionError::Payment(PaymentError::UnknownReference(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            InspectionError::Validation(_) => "VALIDATION_ERROR",
            InspectionError::Listing(err) => err.error_code(),
            InspectionError::AmountMismatch(_) => "PAYMENT_AMOUNT_MISMATCH",
            InspectionError::NotFound(_) => "INSPECTION_NOT_FOUND",
            InspectionError::Forbidden { .. } => "FORBIDDEN",
            InspectionError::Transition(refusal) => refusal.error_code(),
            InspectionError::NegotiationInProgress(_) => "NEGOTIATION_IN_PROGRESS",
            InspectionError::Payment(PaymentError::Gateway(GatewayError::Declined(_))) => {
                "PAYMENT_DECLINED"
            }
            InspectionError::Payment(PaymentError::Gateway(_)) => "PAYMENT_PROVIDER_ERROR",
            InspectionError::Payment(PaymentError::Repository(err))
            | InspectionError::Repository(err) => repository_code(err),
            InspectionError::Payment(PaymentError::UnknownReference(_)) => "TRANSACTION_NOT_FOUND",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            InspectionError::Validation(err) => Some(validation_details(err)),
            InspectionError::AmountMismatch(err) => Some(err.details()),
            _ => None,
        }
    }
}
