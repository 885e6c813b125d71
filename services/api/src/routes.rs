use crate::infra::{AppState, ConciergeState, Marketplace};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use expalink::concierge::{ChatTurn, ConciergeReply};
use expalink::error::AppError;
use expalink::marketplace::{
    marketplace_router, DirectoryFilter, MarketplaceError, ProfessionalRepository,
    ProfileTranslations,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct ConciergeAskRequest {
    pub(crate) query: String,
    #[serde(default = "default_language")]
    pub(crate) language: String,
    #[serde(default)]
    pub(crate) history: Vec<ChatTurn>,
    #[serde(default)]
    pub(crate) city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConciergeTranslateRequest {
    pub(crate) bio: String,
    #[serde(default)]
    pub(crate) specialties: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

pub(crate) fn with_service_routes(marketplace: Arc<Marketplace>) -> axum::Router {
    marketplace_router(marketplace)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/concierge/ask",
            axum::routing::post(concierge_ask_endpoint),
        )
        .route(
            "/api/v1/concierge/translate",
            axum::routing::post(concierge_translate_endpoint),
        )
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

fn concierge_disabled() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "concierge is not configured" })),
    )
        .into_response()
}

pub(crate) async fn concierge_ask_endpoint(
    Extension(state): Extension<ConciergeState>,
    Json(payload): Json<ConciergeAskRequest>,
) -> Result<Response, AppError> {
    let Some(concierge) = state.concierge else {
        return Ok(concierge_disabled());
    };
    if payload.query.trim().is_empty() {
        return Err(MarketplaceError::Validation("query must not be empty".to_string()).into());
    }

    let filter = DirectoryFilter {
        online_only: true,
        ..DirectoryFilter::default()
    };
    let candidates = state
        .store
        .find_professionals(&filter)
        .map_err(MarketplaceError::from)?;

    let reply: ConciergeReply = concierge
        .ask(
            &payload.query,
            &candidates,
            &payload.language,
            &payload.history,
            payload.city.as_deref(),
        )
        .await;

    info!(
        recommended = reply.recommended_ids.len(),
        degraded = reply.degraded,
        "concierge answered"
    );
    Ok(Json(reply).into_response())
}

pub(crate) async fn concierge_translate_endpoint(
    Extension(state): Extension<ConciergeState>,
    Json(payload): Json<ConciergeTranslateRequest>,
) -> Result<Response, AppError> {
    let Some(concierge) = state.concierge else {
        return Ok(concierge_disabled());
    };

    let translations: ProfileTranslations = concierge
        .translate_profile(&payload.bio, &payload.specialties)
        .await;

    Ok(Json(translations).into_response())
}
