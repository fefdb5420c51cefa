mod common;

use axum::http::StatusCode;
use common::*;
use rust_decimal_macros::dec;
use serde_json::json;
use tower::ServiceExt;

use marketplace::workflows::documents::{
    document_admin_router, document_router, DocumentError, DocumentReview, DocumentStatus, ReviewOutcome,
};
use marketplace::workflows::payments::{GatewayError, GatewayStatus, PaymentError};

#[test]
fn paid_documents_wait_for_review_then_verify() {
    let market = marketplace();
    let receipt = market
        .documents
        .submit(document_submission(dec!(20000)))
        .expect("documents submitted");
    assert_eq!(receipt.verification.status, DocumentStatus::PendingPayment);
    assert_eq!(receipt.verification.fee, dec!(20000));
    assert!(market
        .gateway
        .split_for(&receipt.payment.transaction.reference)
        .is_none());

    let report = market
        .dispatcher
        .verify(&receipt.payment.transaction.reference)
        .expect("verification dispatched")
        .effect
        .expect("effects ran");
    assert_eq!(report.emails_sent, 2);
    assert_eq!(report.notifications_sent, 1);
    assert_eq!(market.mailer.sent_to(ADMIN_EMAIL).len(), 1);

    let verified = market
        .documents
        .review(
            &receipt.verification.id,
            DocumentReview {
                outcome: ReviewOutcome::Verified,
                note: None,
            },
        )
        .expect("review recorded");
    assert_eq!(verified.status, DocumentStatus::Verified);
    assert!(verified.reviewed_at.is_some());
    let last = market
        .mailer
        .sent_to(BUYER_EMAIL)
        .last()
        .cloned()
        .expect("review email sent");
    assert_eq!(last.subject, "Documents Verified");
    assert!(last.text.contains("Certificate of Occupancy"));
}

#[test]
fn rejection_requires_a_note() {
    let market = marketplace();
    let receipt = market
        .documents
        .submit(document_submission(dec!(20000)))
        .expect("documents submitted");
    market
        .dispatcher
        .verify(&receipt.payment.transaction.reference)
        .expect("verification dispatched");

    let blank = market.documents.review(
        &receipt.verification.id,
        DocumentReview {
            outcome: ReviewOutcome::Rejected,
            note: Some("   ".to_string()),
        },
    );
    assert!(matches!(blank, Err(DocumentError::Validation(_))));

    let rejected = market
        .documents
        .review(
            &receipt.verification.id,
            DocumentReview {
                outcome: ReviewOutcome::Rejected,
                note: Some("Survey plan is illegible".to_string()),
            },
        )
        .expect("rejection recorded");
    assert_eq!(rejected.status, DocumentStatus::Rejected);
    assert_eq!(rejected.reviewer_note.as_deref(), Some("Survey plan is illegible"));
}

#[test]
fn unpaid_or_failed_requests_cannot_be_reviewed() {
    let market = marketplace();
    let receipt = market
        .documents
        .submit(document_submission(dec!(20000)))
        .expect("documents submitted");
    let review = || DocumentReview {
        outcome: ReviewOutcome::Verified,
        note: None,
    };

    assert!(matches!(
        market.documents.review(&receipt.verification.id, review()),
        Err(DocumentError::NotAwaitingReview {
            status: DocumentStatus::PendingPayment,
            ..
        })
    ));

    market
        .gateway
        .set_outcome(&receipt.payment.transaction.reference, GatewayStatus::Failed);
    market
        .dispatcher
        .verify(&receipt.payment.transaction.reference)
        .expect("verification dispatched");
    assert!(matches!(
        market.documents.review(&receipt.verification.id, review()),
        Err(DocumentError::NotAwaitingReview {
            status: DocumentStatus::PaymentFailed,
            ..
        })
    ));
}

#[test]
fn wrong_fee_is_rejected_before_checkout() {
    let market = marketplace();
    let result = market.documents.submit(document_submission(dec!(15000)));

    assert!(matches!(result, Err(DocumentError::AmountMismatch(_))));
    assert_eq!(market.gateway.initialized(), 0);
}

#[tokio::test]
async fn review_route_reports_state_errors() {
    let market = marketplace();
    let receipt = market
        .documents
        .submit(document_submission(dec!(20000)))
        .expect("documents submitted");
    let review = || {
        post_json(
            &format!("/document-verifications/{}/review", receipt.verification.id),
            json!({ "outcome": "verified" }),
        )
    };

    let response = document_router(market.documents.clone())
        .oneshot(review())
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let router = document_admin_router(market.documents.clone());
    let response = router
        .oneshot(review())
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["errorCode"], json!("DOCUMENTS_NOT_AWAITING_REVIEW"));
}

#[tokio::test]
async fn submit_route_validates_document_links() {
    let market = marketplace();
    let router = document_router(market.documents.clone());

    let response = router
        .oneshot(post_json(
            "/document-verifications",
            json!({
                "requester": { "fullName": "Chioma Buyer", "email": BUYER_EMAIL },
                "documents": [{ "name": "Deed", "url": "ftp://files.example.com/deed" }],
                "amountToBePaid": 20000
            }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["errorCode"], json!("VALIDATION_ERROR"));
}

#[test]
fn repeat_requesters_share_one_buyer_record() {
    let market = marketplace();
    for _ in 0..2 {
        market
            .documents
            .submit(document_submission(dec!(20000)))
            .expect("documents submitted");
    }

    let buyers = market.store.buyers().expect("buyers readable");
    assert_eq!(
        buyers.iter().filter(|buyer| buyer.email == BUYER_EMAIL).count(),
        1
    );
}

#[test]
fn unreachable_gateway_is_reported_as_payment_error() {
    let market = marketplace();
    market
        .gateway
        .fail_initialization(Some(GatewayError::Transport("connection reset".to_string())));

    match market.documents.submit(document_submission(dec!(20000))) {
        Err(DocumentError::Payment(PaymentError::Gateway(GatewayError::Transport(_)))) => {}
        other => panic!("expected gateway failure, got {other:?}"),
    }
}
