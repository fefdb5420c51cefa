use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::domain::{
    DocumentReference, DocumentStatus, DocumentVerification, DocumentVerificationId,
};
use super::repository::DocumentRepository;
use crate::workflows::directory::{
    ensure_amount, AmountMismatch, BuyerContact, DirectoryRepository,
};
use crate::workflows::http::{
    repository_code, repository_status, validation_details, WorkflowError,
};
use crate::workflows::notifications::{format_naira, EmailBody, EmailMessage, Notifier};
use crate::workflows::payments::{
    CheckoutRequest, EffectError, EffectReport, NewTransaction, PaymentError, PaymentService,
    PaymentSession, TransactionEffect, TransactionType,
};
use crate::workflows::store::RepositoryError;
use crate::workflows::validation::{FieldErrors, ValidationError};

static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_verification_id() -> DocumentVerificationId {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DocumentVerificationId(format!("docv-{id:06}"))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSubmission {
    pub requester: BuyerContact,
    pub documents: Vec<DocumentReference>,
    pub amount_to_be_paid: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewOutcome {
    Verified,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReview {
    pub outcome: ReviewOutcome,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReceipt {
    pub verification: DocumentVerification,
    pub payment: PaymentSession,
}

/// Paid document verification: intake, payment effects, and admin review.
pub struct DocumentVerificationService {
    directory: Arc<dyn DirectoryRepository>,
    documents: Arc<dyn DocumentRepository>,
    payments: Arc<PaymentService>,
    notifier: Notifier,
}

impl DocumentVerificationService {
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        documents: Arc<dyn DocumentRepository>,
        payments: Arc<PaymentService>,
        notifier: Notifier,
    ) -> Self {
        Self {
            directory,
            documents,
            payments,
            notifier,
        }
    }

    pub fn get(&self, id: &DocumentVerificationId) -> Result<DocumentVerification, DocumentError> {
        self.documents
            .fetch(id)?
            .ok_or_else(|| DocumentError::NotFound(id.clone()))
    }

    pub fn submit(&self, submission: DocumentSubmission) -> Result<DocumentReceipt, DocumentError> {
        validate_submission(&submission)?;
        let fee = self.payments.config().document_verification_fee;
        ensure_amount(fee, submission.amount_to_be_paid)?;

        let requester = self.directory.upsert_buyer(&submission.requester)?.contact();
        let payment = self.payments.open_checkout(CheckoutRequest {
            transaction_type: TransactionType::DocumentVerification,
            email: requester.email.clone(),
            amount: fee,
            split_subaccount: None,
            metadata: json!({ "documents": submission.documents.len() }),
        })?;

        let now = Utc::now();
        let verification = self.documents.insert(DocumentVerification {
            id: next_verification_id(),
            requester,
            documents: submission.documents,
            fee,
            transaction_id: payment.transaction.id.clone(),
            status: DocumentStatus::PendingPayment,
            reviewer_note: None,
            reviewed_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })?;

        info!(
            verification = %verification.id,
            reference = %payment.transaction.reference,
            "document verification submitted"
        );
        Ok(DocumentReceipt {
            verification,
            payment,
        })
    }

    /// Admin decision on a paid request.
    pub fn review(
        &self,
        id: &DocumentVerificationId,
        review: DocumentReview,
    ) -> Result<DocumentVerification, DocumentError> {
        let current = self.get(id)?;
        if current.status != DocumentStatus::AwaitingReview {
            return Err(DocumentError::NotAwaitingReview {
                id: current.id,
                status: current.status,
            });
        }
        let note = review
            .note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
            .map(str::to_string);
        if review.outcome == ReviewOutcome::Rejected && note.is_none() {
            return Err(ValidationError::single("note", "a note is required when rejecting").into());
        }

        let now = Utc::now();
        let version = current.version;
        let mut next = current;
        next.status = match review.outcome {
            ReviewOutcome::Verified => DocumentStatus::Verified,
            ReviewOutcome::Rejected => DocumentStatus::Rejected,
        };
        next.reviewer_note = note;
        next.reviewed_at = Some(now);
        next.updated_at = now;
        let verification = self.documents.update(next, version)?;

        self.notifier.email(&review_email(&verification));
        self.notifier.notify(
            &verification.requester.id,
            "Document Verification Update",
            &format!("Your documents were {}", verification.status.label()),
            json!({ "verificationId": verification.id }),
        );
        info!(
            verification = %verification.id,
            status = verification.status.label(),
            "document verification reviewed"
        );
        Ok(verification)
    }

    fn settle(
        &self,
        transaction: &NewTransaction,
        status: DocumentStatus,
    ) -> Result<Option<DocumentVerification>, EffectError> {
        let verification = self
            .documents
            .by_transaction(&transaction.id)?
            .ok_or_else(|| EffectError::Unlinked {
                kind: "document verification",
                reference: transaction.reference.clone(),
            })?;
        if verification.status != DocumentStatus::PendingPayment {
            return Ok(None);
        }

        let version = verification.version;
        let mut next = verification;
        next.status = status;
        next.updated_at = Utc::now();
        match self.documents.update(next, version) {
            Ok(updated) => Ok(Some(updated)),
            Err(RepositoryError::VersionMismatch { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl TransactionEffect for DocumentVerificationService {
    fn on_success(&self, transaction: &NewTransaction) -> Result<EffectReport, EffectError> {
        let Some(verification) = self.settle(transaction, DocumentStatus::AwaitingReview)? else {
            return Ok(EffectReport::skipped());
        };

        let requester = &verification.requester;
        let emails_sent = self.notifier.email_all(&[
            EmailBody::new(&requester.full_name, "Documents Received")
                .paragraph("Your payment was received. Our team will review your documents shortly.")
                .detail("Documents", verification.documents.len().to_string())
                .detail("Amount paid", format_naira(transaction.amount))
                .render(&requester.email, "Documents Received"),
            EmailBody::new("", "Document Verification Awaiting Review")
                .paragraph(format!(
                    "{} paid for verification of {} document(s).",
                    requester.full_name,
                    verification.documents.len()
                ))
                .detail("Request", verification.id.0.clone())
                .render(self.notifier.admin_email(), "Document Verification Awaiting Review"),
        ]);
        let sent = self.notifier.notify(
            &requester.id,
            "Documents Received",
            "Your documents are awaiting review",
            json!({ "verificationId": verification.id }),
        );

        Ok(EffectReport {
            applied: true,
            records: 1,
            emails_sent,
            notifications_sent: usize::from(sent),
        })
    }

    fn on_failure(&self, transaction: &NewTransaction) -> Result<EffectReport, EffectError> {
        let Some(verification) = self.settle(transaction, DocumentStatus::PaymentFailed)? else {
            return Ok(EffectReport::skipped());
        };

        let requester = &verification.requester;
        let sent = self.notifier.email(
            &EmailBody::new(&requester.full_name, "Document Verification Payment Failed")
                .paragraph("We could not confirm your payment, so your documents were not submitted for review.")
                .detail("Reference", transaction.reference.clone())
                .render(&requester.email, "Document Verification Payment Failed"),
        );
        warn!(verification = %verification.id, "document verification payment failed");

        Ok(EffectReport {
            applied: true,
            records: 1,
            emails_sent: usize::from(sent),
            notifications_sent: 0,
        })
    }
}

fn review_email(verification: &DocumentVerification) -> EmailMessage {
    let (subject, opening) = match verification.status {
        DocumentStatus::Verified => (
            "Documents Verified",
            "Your documents have been verified.",
        ),
        _ => (
            "Documents Could Not Be Verified",
            "We were unable to verify your documents.",
        ),
    };
    let mut body = EmailBody::new(&verification.requester.full_name, subject).paragraph(opening);
    for document in &verification.documents {
        body = body.detail(document.name.clone(), document.url.clone());
    }
    if let Some(note) = &verification.reviewer_note {
        body = body.detail("Reviewer note", note.clone());
    }
    body.render(&verification.requester.email, subject)
}

fn validate_submission(submission: &DocumentSubmission) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::new();
    errors.require_text(&submission.requester.full_name, "requester.fullName");
    errors.require_email(&submission.requester.email, "requester.email");
    errors.ensure(
        !submission.documents.is_empty(),
        "documents",
        "at least one document is required",
    );
    for (index, document) in submission.documents.iter().enumerate() {
        errors.require_text(&document.name, format!("documents[{index}].name"));
        errors.ensure(
            document.url.starts_with("https://") || document.url.starts_with("http://"),
            format!("documents[{index}].url"),
            "url must be an http(s) link",
        );
    }
    errors.finish()
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    AmountMismatch(#[from] AmountMismatch),
    #[error("document verification {0} was not found")]
    NotFound(DocumentVerificationId),
    #[error("document verification {id} is {} and cannot be reviewed", .status.label())]
    NotAwaitingReview {
        id: DocumentVerificationId,
        status: DocumentStatus,
    },
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError for DocumentError {
    fn status(&self) -> StatusCode {
        match self {
            DocumentError::Validation(_)
            | DocumentError::AmountMismatch(_)
            | DocumentError::NotAwaitingReview { .. } => StatusCode::BAD_REQUEST,
            DocumentError::NotFound(_) => StatusCode::NOT_FOUND,
            DocumentError::Payment(PaymentError::Gateway(_)) => StatusCode::BAD_GATEWAY,
            DocumentError::Payment(PaymentError::Repository(err))
            | DocumentError::Repository(err) => repository_status(err),
            DocumentError::Payment(PaymentError::UnknownReference(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            DocumentError::Validation(_) => "VALIDATION_ERROR",
            DocumentError::AmountMismatch(_) => "PAYMENT_AMOUNT_MISMATCH",
            DocumentError::NotFound(_) => "DOCUMENT_VERIFICATION_NOT_FOUND",
            DocumentError::NotAwaitingReview { .. } => "DOCUMENTS_NOT_AWAITING_REVIEW",
            DocumentError::Payment(PaymentError::Gateway(_)) => "PAYMENT_PROVIDER_ERROR",
            DocumentError::Payment(PaymentError::Repository(err))
            | DocumentError::Repository(err) => repository_code(err),
            DocumentError::Payment(PaymentError::UnknownReference(_)) => "TRANSACTION_NOT_FOUND",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            DocumentError::Validation(err) => Some(validation_details(err)),
            DocumentError::AmountMismatch(err) => Some(err.details()),
            _ => None,
        }
    }
}
