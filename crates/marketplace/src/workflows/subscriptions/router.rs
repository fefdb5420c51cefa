use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use super::domain::SubscriptionId;
use super::service::{SubscribeRequest, SubscriptionService};
use crate::workflows::directory::UserId;
use crate::workflows::http::{error_response, rejection_response, success_response};

pub fn subscription_router(service: Arc<SubscriptionService>) -> Router {
    Router::new()
        .route("/subscriptions", post(subscribe_handler))
        .route("/subscriptions/plans", get(plans_handler))
        .route("/subscriptions/:subscription_id", get(get_handler))
        .route(
            "/subscriptions/:subscription_id/cancel-auto-renew/:user_id",
            post(cancel_auto_renew_handler),
        )
        .with_state(service)
}

pub(crate) async fn subscribe_handler(
    State(service): State<Arc<SubscriptionService>>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.subscribe(request) {
        Ok(receipt) => success_response(
            StatusCode::CREATED,
            "Subscription checkout created",
            json!(receipt),
        ),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn plans_handler(State(service): State<Arc<SubscriptionService>>) -> Response {
    success_response(
        StatusCode::OK,
        "Plans retrieved",
        json!(service.catalog().plans()),
    )
}

pub(crate) async fn get_handler(
    State(service): State<Arc<SubscriptionService>>,
    Path(subscription_id): Path<String>,
) -> Response {
    match service.get(&SubscriptionId(subscription_id)) {
        Ok(subscription) => success_response(
            StatusCode::OK,
            "Subscription found",
            json!(subscription),
        ),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn cancel_auto_renew_handler(
    State(service): State<Arc<SubscriptionService>>,
    Path((subscription_id, user_id)): Path<(String, String)>,
) -> Response {
    match service.cancel_auto_renew(&SubscriptionId(subscription_id), &UserId(user_id)) {
        Ok(subscription) => success_response(
            StatusCode::OK,
            "Auto-renew turned off",
            json!(subscription),
        ),
        Err(err) => error_response(&err),
    }
}
