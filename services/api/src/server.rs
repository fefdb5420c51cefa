use crate::cli::ServeArgs;
use crate::infra::{AppState, LogMailer, Services};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use marketplace::config::AppConfig;
use marketplace::error::AppError;
use marketplace::telemetry;
use marketplace::workflows::directory::CatalogImporter;
use marketplace::workflows::maintenance::MaintenanceJobs;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const MAINTENANCE_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let services = Services::build(
        config.payments.clone(),
        config.notifications.clone(),
        Arc::new(LogMailer),
    );
    if let Some(path) = args.deal_sites.take() {
        let loaded = CatalogImporter::seed_deal_sites(&path, services.store.as_ref())?;
        info!(loaded, path = %path.display(), "deal sites seeded");
    }
    if let Some(path) = args.catalog.take() {
        let loaded = CatalogImporter::seed_properties(&path, services.store.as_ref())?;
        info!(loaded, path = %path.display(), "property catalog seeded");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_marketplace_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    tokio::spawn(run_maintenance(services.maintenance()));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "marketplace service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Runs the daily sweeps; the first tick fires immediately at startup.
async fn run_maintenance(jobs: MaintenanceJobs) {
    let mut ticker = tokio::time::interval(MAINTENANCE_PERIOD);
    loop {
        ticker.tick().await;
        jobs.run_daily(Utc::now());
    }
}
