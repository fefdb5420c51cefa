use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::domain::{BookingId, BookingStatus};
use super::service::{BookingChannel, BookingReceipt, BookingRequest, BookingService, OwnerReply};
use crate::workflows::http::{
    error_response, query_rejection_response, rejection_response, success_response,
};

pub fn booking_router(service: Arc<BookingService>) -> Router {
    Router::new()
        .route("/deal-sites/:public_slug/book-request", post(deal_site_handler))
        .route("/bookings/book-request", post(general_handler))
        .route("/bookings/lookup", get(lookup_handler))
        .route("/bookings/:booking_id/owner-response", post(owner_response_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LookupQuery {
    booking_code: String,
    pass_code: String,
}

pub(crate) async fn deal_site_handler(
    State(service): State<Arc<BookingService>>,
    Path(public_slug): Path<String>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Response {
    submit(&service, BookingChannel::DealSite(public_slug), payload)
}

pub(crate) async fn general_handler(
    State(service): State<Arc<BookingService>>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Response {
    submit(&service, BookingChannel::General, payload)
}

fn submit(
    service: &BookingService,
    channel: BookingChannel,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.submit(channel, request) {
        Ok(receipt) => {
            let message = match receipt.booking.status {
                BookingStatus::Requested => "Booking request sent to the owner",
                _ => "Booking created; complete payment to confirm",
            };
            receipt_response(StatusCode::CREATED, message, &receipt)
        }
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn owner_response_handler(
    State(service): State<Arc<BookingService>>,
    Path(booking_id): Path<String>,
    payload: Result<Json<OwnerReply>, JsonRejection>,
) -> Response {
    let Json(reply) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.respond(&BookingId(booking_id), reply) {
        Ok(receipt) => {
            let message = format!("Booking {}", receipt.booking.status.label());
            receipt_response(StatusCode::OK, &message, &receipt)
        }
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn lookup_handler(
    State(service): State<Arc<BookingService>>,
    query: Result<Query<LookupQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection_response(rejection),
    };

    match service.lookup(&query.booking_code, &query.pass_code) {
        Ok(booking) => success_response(StatusCode::OK, "Booking found", json!(booking)),
        Err(err) => error_response(&err),
    }
}

fn receipt_response(status: StatusCode, message: &str, receipt: &BookingReceipt) -> Response {
    success_response(status, message, json!(receipt))
}
