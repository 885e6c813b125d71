use crate::cli::ServeArgs;
use crate::infra::{build_concierge, build_marketplace, load_store, AppState, ConciergeState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use expalink::config::AppConfig;
use expalink::error::AppError;
use expalink::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = load_store(args.seed_csv.as_deref(), Utc::now())?;
    let marketplace = build_marketplace(&config, store.clone());
    let concierge_state = ConciergeState {
        concierge: build_concierge(&config.assistant),
        store,
    };

    let app = with_service_routes(marketplace)
        .layer(Extension(app_state))
        .layer(Extension(concierge_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "expalink marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}
