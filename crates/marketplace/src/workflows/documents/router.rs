use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use super::domain::DocumentVerificationId;
use super::service::{DocumentReview, DocumentSubmission, DocumentVerificationService};
use crate::workflows::http::{error_response, rejection_response, success_response};

pub fn document_router(service: Arc<DocumentVerificationService>) -> Router {
    Router::new()
        .route("/document-verifications", post(submit_handler))
        .route("/document-verifications/:verification_id", get(get_handler))
        .with_state(service)
}

/// Reviewer endpoints; mount only behind the admin authentication layer.
pub fn document_admin_router(service: Arc<DocumentVerificationService>) -> Router {
    Router::new()
        .route(
            "/document-verifications/:verification_id/review",
            post(review_handler),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<DocumentVerificationService>>,
    payload: Result<Json<DocumentSubmission>, JsonRejection>,
) -> Response {
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.submit(submission) {
        Ok(receipt) => success_response(
            StatusCode::CREATED,
            "Document verification submitted",
            json!(receipt),
        ),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn get_handler(
    State(service): State<Arc<DocumentVerificationService>>,
    Path(verification_id): Path<String>,
) -> Response {
    match service.get(&DocumentVerificationId(verification_id)) {
        Ok(verification) => success_response(
            StatusCode::OK,
            "Document verification found",
            json!(verification),
        ),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn review_handler(
    State(service): State<Arc<DocumentVerificationService>>,
    Path(verification_id): Path<String>,
    payload: Result<Json<DocumentReview>, JsonRejection>,
) -> Response {
    let Json(review) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.review(&DocumentVerificationId(verification_id), review) {
        Ok(verification) => success_response(
            StatusCode::OK,
            &format!("Documents {}", verification.status.label()),
            json!(verification),
        ),
        Err(err) => error_response(&err),
    }
}
