use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::workflows::http::error_response;
use crate::workflows::inspections::{
    inspection_admin_router, inspection_router, InspectionError, Stage,
};
use crate::workflows::store::RepositoryError;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn request_inspection_route_returns_created_records() {
    let harness = harness();
    let router = inspection_router(harness.service.clone());

    let response = router
        .oneshot(post_json(
            &format!("/deal-sites/{SLUG}/request-inspection"),
            json!({
                "requester": { "fullName": "Ada Obi", "email": BUYER_EMAIL },
                "properties": [
                    { "propertyId": "prop-ikoyi", "negotiationPrice": 45000000 },
                    { "propertyId": "prop-lekki" }
                ],
                "inspectionDate": "2024-03-08",
                "inspectionTime": "10:00",
                "amountToBePaid": 12500
            }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["inspections"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        body["data"]["inspections"][0]["status"],
        json!("pending_transaction")
    );
    assert!(body["data"]["payment"]["checkout"]["authorizationUrl"]
        .as_str()
        .is_some_and(|url| url.starts_with("https://")));
}

#[tokio::test]
async fn amount_mismatch_reports_expected_and_received() {
    let harness = harness();
    let router = inspection_router(harness.service.clone());

    let response = router
        .oneshot(post_json(
            &format!("/deal-sites/{SLUG}/request-inspection"),
            json!({
                "requester": { "fullName": "Ada Obi", "email": BUYER_EMAIL },
                "properties": [{ "propertyId": "prop-lekki" }],
                "inspectionDate": "2024-03-08",
                "inspectionTime": "10:00",
                "amountToBePaid": 7000
            }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["errorCode"], json!("PAYMENT_AMOUNT_MISMATCH"));
    assert_eq!(body["expected"], json!("7500"));
    assert_eq!(body["received"], json!("7000"));
}

#[tokio::test]
async fn action_route_applies_seller_acceptance() {
    let harness = harness();
    let inspection = submit_and_pay(&harness, vec![offer("prop-ikoyi", dec!(45000000))], dec!(5000))
        .remove(0);
    let router = inspection_router(harness.service.clone());

    let response = router
        .oneshot(post_json(
            &format!("/inspections/{}/actions/seller-1", inspection.id),
            json!({
                "action": "accept",
                "inspectionType": "price",
                "userType": "seller"
            }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["data"]["inspection"]["stage"], json!("inspection"));
    assert_eq!(body["data"]["inspection"]["pendingResponseFrom"], json!("buyer"));
    assert_eq!(body["data"]["emailsSent"], json!(true));
    assert_eq!(body["data"]["logCreated"], json!(true));
}

#[tokio::test]
async fn action_route_forbids_other_users() {
    let harness = harness();
    let inspection = submit_and_pay(&harness, vec![offer("prop-ikoyi", dec!(45000000))], dec!(5000))
        .remove(0);
    let router = inspection_router(harness.service.clone());

    let response = router
        .oneshot(post_json(
            &format!("/inspections/{}/actions/intruder", inspection.id),
            json!({ "action": "accept", "inspectionType": "price", "userType": "seller" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json_body(response).await;
    assert_eq!(body["errorCode"], json!("FORBIDDEN"));
}

#[tokio::test]
async fn malformed_action_body_is_a_validation_error() {
    let harness = harness();
    let router = inspection_router(harness.service.clone());

    let response = router
        .oneshot(post_json(
            "/inspections/insp-000001/actions/seller-1",
            json!({ "action": "haggle", "inspectionType": "price", "userType": "seller" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["errorCode"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn unknown_inspection_is_not_found() {
    let harness = harness();
    let router = inspection_router(harness.service.clone());

    let response = router
        .oneshot(
            Request::get("/inspections/insp-missing")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["errorCode"], json!("INSPECTION_NOT_FOUND"));
}

#[tokio::test]
async fn completion_is_only_served_by_the_admin_router() {
    let harness = harness();
    let inspection = submit_and_pay(&harness, vec![offer("prop-ikoyi", dec!(45000000))], dec!(5000))
        .remove(0);
    let uri = format!("/inspections/{}/complete", inspection.id);
    let complete = || Request::post(uri.as_str()).body(Body::empty()).expect("request builds");

    let response = inspection_router(harness.service.clone())
        .oneshot(complete())
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = inspection_admin_router(harness.service.clone())
        .oneshot(complete())
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["errorCode"], json!("NEGOTIATION_IN_PROGRESS"));
    assert_eq!(
        harness.service.get(&inspection.id).expect("stored").stage,
        Stage::Negotiation
    );
}

#[tokio::test]
async fn concurrent_update_maps_to_conflict() {
    let response = error_response(&InspectionError::Repository(
        RepositoryError::VersionMismatch {
            expected: 2,
            found: 3,
        },
    ));

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert_eq!(body["errorCode"], json!("CONCURRENT_UPDATE"));
}
