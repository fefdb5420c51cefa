use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use super::dispatcher::{DispatchError, EffectError, PaymentEffectDispatcher};
use super::service::PaymentError;
use crate::workflows::http::{
    error_response, query_rejection_response, repository_code, repository_status, success_response,
    WorkflowError,
};

/// Verification endpoints hit by the provider webhook and the checkout redirect.
pub fn payment_router(dispatcher: Arc<PaymentEffectDispatcher>) -> Router {
    Router::new()
        .route("/payments/:reference/verify", post(verify_handler))
        .route("/payments/callback", get(callback_handler))
        .with_state(dispatcher)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackQuery {
    reference: String,
}

pub(crate) async fn verify_handler(
    State(dispatcher): State<Arc<PaymentEffectDispatcher>>,
    Path(reference): Path<String>,
) -> Response {
    respond(&dispatcher, &reference)
}

pub(crate) async fn callback_handler(
    State(dispatcher): State<Arc<PaymentEffectDispatcher>>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection_response(rejection),
    };
    respond(&dispatcher, &query.reference)
}

fn respond(dispatcher: &PaymentEffectDispatcher, reference: &str) -> Response {
    match dispatcher.verify(reference) {
        Ok(outcome) => {
            let message = format!("transaction {}", outcome.transaction.status.label());
            success_response(StatusCode::OK, &message, json!(outcome))
        }
        Err(err) => error_response(&err),
    }
}

impl WorkflowError for DispatchError {
    fn status(&self) -> StatusCode {
        match self {
            DispatchError::Payment(PaymentError::UnknownReference(_)) => StatusCode::NOT_FOUND,
            DispatchError::Payment(PaymentError::Gateway(_)) => StatusCode::BAD_GATEWAY,
            DispatchError::Payment(PaymentError::Repository(err))
            | DispatchError::Effect(EffectError::Repository(err)) => repository_status(err),
            DispatchError::Effect(_) | DispatchError::Unhandled(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            DispatchError::Payment(PaymentError::UnknownReference(_)) => "TRANSACTION_NOT_FOUND",
            DispatchError::Payment(PaymentError::Gateway(_)) => "PAYMENT_PROVIDER_ERROR",
            DispatchError::Payment(PaymentError::Repository(err))
            | DispatchError::Effect(EffectError::Repository(err)) => repository_code(err),
            DispatchError::Effect(_) => "PAYMENT_EFFECT_FAILED",
            DispatchError::Unhandled(_) => "UNSUPPORTED_TRANSACTION_TYPE",
        }
    }
}
