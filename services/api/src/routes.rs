use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use marketplace::workflows::bookings::booking_router;
use marketplace::workflows::documents::{document_admin_router, document_router};
use marketplace::workflows::inspections::{inspection_admin_router, inspection_router};
use marketplace::workflows::payments::payment_router;
use marketplace::workflows::subscriptions::subscription_router;
use serde_json::json;

pub(crate) fn with_marketplace_routes(services: &Services) -> Router {
    payment_router(services.dispatcher.clone())
        .merge(inspection_router(services.inspections.clone()))
        .merge(booking_router(services.bookings.clone()))
        .merge(document_router(services.documents.clone()))
        .merge(subscription_router(services.subscriptions.clone()))
        .nest("/admin", admin_routes(services))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

/// Back-office routes, served under `/admin`. Requests reaching them are
/// trusted as admin, so the prefix must sit behind the operator's auth proxy.
fn admin_routes(services: &Services) -> Router {
    inspection_admin_router(services.inspections.clone())
        .merge(document_admin_router(services.documents.clone()))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::LogMailer;
    use axum::body::Body;
    use axum::http::Request;
    use marketplace::config::{NotificationConfig, PaymentConfig};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(ready: bool) -> Router {
        let services = Services::build(
            PaymentConfig::default(),
            NotificationConfig::default(),
            Arc::new(LogMailer),
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_marketplace_routes(&services).layer(Extension(state))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
            .await
            .expect("router responds");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&body).expect("json payload"))
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let (status, body) = get_json(app(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], json!("initializing"));

        let (status, body) = get_json(app(true), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ready"));
    }

    #[tokio::test]
    async fn workflow_routers_are_merged() {
        let (status, body) = get_json(app(true), "/subscriptions/plans").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(3));

        let (status, body) = get_json(app(true), "/payments/callback?reference=INS-1-NOPE00").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorCode"], json!("TRANSACTION_NOT_FOUND"));
    }

    #[tokio::test]
    async fn admin_actions_live_under_the_admin_prefix() {
        let complete = |uri: &str| {
            Request::post(uri.to_string())
                .body(Body::empty())
                .expect("request builds")
        };

        let response = app(true)
            .oneshot(complete("/inspections/insp-missing/complete"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        assert!(body.is_empty());

        let response = app(true)
            .oneshot(complete("/admin/inspections/insp-missing/complete"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let body: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(body["errorCode"], json!("INSPECTION_NOT_FOUND"));
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let (status, body) = get_json(app(false), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
    }
}
