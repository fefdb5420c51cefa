use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use super::domain::InspectionId;
use super::negotiation::NegotiationRequest;
use super::service::{CancelRequest, InspectionService, InspectionSubmission};
use crate::workflows::directory::UserId;
use crate::workflows::http::{error_response, rejection_response, success_response};

/// Buyer/seller negotiation endpoints plus deal-site inspection intake.
pub fn inspection_router(service: Arc<InspectionService>) -> Router {
    Router::new()
        .route(
            "/deal-sites/:public_slug/request-inspection",
            post(request_inspection_handler),
        )
        .route("/inspections/:inspection_id", get(get_handler))
        .route(
            "/inspections/:inspection_id/actions/:user_id",
            post(action_handler),
        )
        .route(
            "/inspections/:inspection_id/cancel/:user_id",
            post(cancel_handler),
        )
        .with_state(service)
}

/// Back-office endpoints. The caller is trusted as an admin, so the router
/// must only be mounted behind the admin authentication layer.
pub fn inspection_admin_router(service: Arc<InspectionService>) -> Router {
    Router::new()
        .route("/inspections/:inspection_id/complete", post(complete_handler))
        .with_state(service)
}

pub(crate) async fn request_inspection_handler(
    State(service): State<Arc<InspectionService>>,
    Path(public_slug): Path<String>,
    payload: Result<Json<InspectionSubmission>, JsonRejection>,
) -> Response {
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.submit_request(&public_slug, submission) {
        Ok(receipt) => success_response(
            StatusCode::CREATED,
            "Inspection request submitted",
            json!(receipt),
        ),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn get_handler(
    State(service): State<Arc<InspectionService>>,
    Path(inspection_id): Path<String>,
) -> Response {
    match service.get(&InspectionId(inspection_id)) {
        Ok(inspection) => success_response(StatusCode::OK, "Inspection found", json!(inspection)),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn action_handler(
    State(service): State<Arc<InspectionService>>,
    Path((inspection_id, user_id)): Path<(String, String)>,
    payload: Result<Json<NegotiationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    let action = request.action;

    match service.apply_action(&InspectionId(inspection_id), &UserId(user_id), request) {
        Ok(receipt) => success_response(
            StatusCode::OK,
            &format!("Inspection {} processed", action.label()),
            json!(receipt),
        ),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn cancel_handler(
    State(service): State<Arc<InspectionService>>,
    Path((inspection_id, user_id)): Path<(String, String)>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.cancel(&InspectionId(inspection_id), &UserId(user_id), request) {
        Ok(receipt) => success_response(StatusCode::OK, "Inspection cancelled", json!(receipt)),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn complete_handler(
    State(service): State<Arc<InspectionService>>,
    Path(inspection_id): Path<String>,
) -> Response {
    match service.complete(&InspectionId(inspection_id)) {
        Ok(receipt) => success_response(StatusCode::OK, "Inspection completed", json!(receipt)),
        Err(err) => error_response(&err),
    }
}
