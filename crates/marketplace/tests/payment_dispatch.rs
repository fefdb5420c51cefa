mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::json;
use tower::ServiceExt;
use rust_decimal_macros::dec;

use marketplace::workflows::activity::ActivitySubject;
use marketplace::workflows::bookings::{BookingChannel, BookingStatus};
use marketplace::workflows::documents::DocumentStatus;
use marketplace::workflows::inspections::InspectionRecordStatus;
use marketplace::workflows::payments::{
    payment_router, DispatchError, GatewayStatus, PaymentError, TransactionStatus,
};
use marketplace::workflows::subscriptions::SubscriptionStatus;

#[test]
fn each_transaction_type_reaches_its_own_workflow() {
    let market = marketplace();

    let inspection = market
        .inspections
        .submit_request(SLUG, inspection_submission())
        .expect("inspection submitted");
    let booking = market
        .bookings
        .submit(BookingChannel::DealSite(SLUG.to_string()), three_night_stay())
        .expect("booking submitted");
    let documents = market
        .documents
        .submit(document_submission(dec!(20000)))
        .expect("documents submitted");
    let subscription = market
        .subscriptions
        .subscribe(subscribe_request("basic-monthly"))
        .expect("subscription checkout opened");

    let booking_reference = booking
        .payment
        .as_ref()
        .expect("instant booking opens checkout")
        .transaction
        .reference
        .clone();
    for reference in [
        &inspection.payment.transaction.reference,
        &booking_reference,
        &documents.payment.transaction.reference,
        &subscription.payment.transaction.reference,
    ] {
        let outcome = market.dispatcher.verify(reference).expect("verification dispatched");
        assert_eq!(outcome.transaction.status, TransactionStatus::Success);
        let report = outcome.effect.expect("effects ran");
        assert!(report.applied, "{reference} should apply its effect");
        assert_eq!(report.records, 1);
    }

    let inspection = market
        .inspections
        .get(&inspection.inspections[0].id)
        .expect("inspection stored");
    assert_eq!(inspection.status, InspectionRecordStatus::ActiveNegotiation);
    assert_eq!(
        market.bookings.get(&booking.booking.id).expect("booking stored").status,
        BookingStatus::Confirmed
    );
    assert_eq!(
        market
            .documents
            .get(&documents.verification.id)
            .expect("verification stored")
            .status,
        DocumentStatus::AwaitingReview
    );
    assert_eq!(
        market
            .subscriptions
            .get(&subscription.subscription.id)
            .expect("subscription stored")
            .status,
        SubscriptionStatus::Active
    );

    let transactions = market.store.transactions().expect("transactions readable");
    assert_eq!(transactions.len(), 4);
    assert!(transactions
        .iter()
        .all(|transaction| transaction.status == TransactionStatus::Success));

    let trail = market.store.activity().expect("activity readable");
    assert!(trail
        .iter()
        .any(|entry| entry.subject == ActivitySubject::Inspection(inspection.id.0.clone())));
    assert!(trail
        .iter()
        .any(|entry| entry.subject == ActivitySubject::Booking(booking.booking.id.0.clone())));
}

#[test]
fn replayed_callbacks_do_not_repeat_effects() {
    let market = marketplace();
    let receipt = market
        .documents
        .submit(document_submission(dec!(20000)))
        .expect("documents submitted");
    let reference = receipt.payment.transaction.reference;

    let first = market.dispatcher.verify(&reference).expect("first verification");
    assert!(first.effect.expect("effects ran").applied);
    let sent_after_first = market.mailer.sent().len();

    let second = market.dispatcher.verify(&reference).expect("replayed verification");
    assert!(!second.effect.expect("guard evaluated").applied);
    assert_eq!(market.mailer.sent().len(), sent_after_first);
}

#[test]
fn pending_provider_status_defers_effects() {
    let market = marketplace();
    let receipt = market
        .subscriptions
        .subscribe(subscribe_request("pro-monthly"))
        .expect("checkout opened");
    let reference = receipt.payment.transaction.reference;
    market.gateway.set_outcome(&reference, GatewayStatus::Pending);

    let outcome = market.dispatcher.verify(&reference).expect("verification ran");
    assert_eq!(outcome.transaction.status, TransactionStatus::Pending);
    assert!(outcome.effect.is_none());
    assert_eq!(
        market
            .subscriptions
            .get(&receipt.subscription.id)
            .expect("subscription stored")
            .status,
        SubscriptionStatus::Pending
    );

    market.gateway.set_outcome(&reference, GatewayStatus::Failed);
    let outcome = market.dispatcher.verify(&reference).expect("verification ran");
    assert_eq!(outcome.transaction.status, TransactionStatus::Failed);
    assert_eq!(
        market
            .subscriptions
            .get(&receipt.subscription.id)
            .expect("subscription stored")
            .status,
        SubscriptionStatus::Failed
    );
}

#[test]
fn unknown_reference_is_reported() {
    let market = marketplace();
    assert!(matches!(
        market.dispatcher.verify("INS-0-NOPE00"),
        Err(DispatchError::Payment(PaymentError::UnknownReference(_)))
    ));
}

#[tokio::test]
async fn callback_without_reference_is_a_validation_error() {
    let market = marketplace();
    let router = payment_router(market.dispatcher.clone());

    let response = router
        .oneshot(
            Request::get("/payments/callback?trxref=")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["errorCode"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn callback_verifies_the_referenced_checkout() {
    let market = marketplace();
    let receipt = market
        .documents
        .submit(document_submission(dec!(20000)))
        .expect("documents submitted");
    let router = payment_router(market.dispatcher.clone());

    let response = router
        .oneshot(
            Request::get(format!(
                "/payments/callback?reference={}",
                receipt.payment.transaction.reference
            ))
            .body(Body::empty())
            .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["data"]["transaction"]["status"], json!("success"));
}
