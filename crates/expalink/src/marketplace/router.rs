use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    ConsumerAccount, ConsumerId, PlanTier, Professional, ProfessionalId, Review, ReviewId,
    UnlockToken,
};
use super::error::MarketplaceError;
use super::profile::{ProfileTranslations, ProfileUpdate};
use super::repository::MarketplaceStore;
use super::reviews::{
    PendingReview, ReviewDecision, ReviewEligibility, ReviewSubmission,
};
use super::search::SearchQuery;
use super::service::MarketplaceService;
use super::session::Session;
use super::subscription::{CheckoutGateway, CheckoutSession, CreditPack};
use super::unlock::UnlockOutcome;
use super::views::{AuthoredReview, ContactAccess, ProfessionalView, PublicReview};

type SharedService<S, C> = Arc<MarketplaceService<S, C>>;

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = match &self {
            MarketplaceError::InsufficientCredits => json!({
                "error": self.to_string(),
                "purchase": "/api/v1/credits/checkout",
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(payload)).into_response()
    }
}

/// Router builder exposing the marketplace endpoints.
pub fn marketplace_router<S, C>(service: SharedService<S, C>) -> Router
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/professionals",
            post(register_handler::<S, C>),
        )
        .route(
            "/api/v1/professionals/search",
            get(search_handler::<S, C>),
        )
        .route(
            "/api/v1/professionals/:id",
            get(profile_handler::<S, C>),
        )
        .route(
            "/api/v1/professionals/:id/profile",
            put(save_profile_handler::<S, C>),
        )
        .route(
            "/api/v1/professionals/:id/submit",
            post(submit_profile_handler::<S, C>),
        )
        .route(
            "/api/v1/professionals/:id/identity",
            post(identity_documents_handler::<S, C>),
        )
        .route(
            "/api/v1/professionals/:id/plan",
            post(select_plan_handler::<S, C>),
        )
        .route(
            "/api/v1/professionals/:id/plan/cancel",
            post(cancel_plan_handler::<S, C>),
        )
        .route(
            "/api/v1/professionals/:id/plan/reactivate",
            post(reactivate_plan_handler::<S, C>),
        )
        .route(
            "/api/v1/professionals/:id/review-eligibility",
            get(review_eligibility_handler::<S, C>),
        )
        .route(
            "/api/v1/professionals/:id/reviews",
            get(public_reviews_handler::<S, C>),
        )
        .route(
            "/api/v1/unlocks",
            post(unlock_handler::<S, C>).get(unlocks_handler::<S, C>),
        )
        .route("/api/v1/reviews", post(submit_review_handler::<S, C>))
        .route("/api/v1/reviews/mine", get(my_reviews_handler::<S, C>))
        .route(
            "/api/v1/reviews/pending",
            get(pending_reviews_handler::<S, C>),
        )
        .route("/api/v1/account", get(account_handler::<S, C>))
        .route(
            "/api/v1/credits/checkout",
            post(credit_checkout_handler::<S, C>),
        )
        .route(
            "/api/v1/admin/moderation",
            get(moderation_queue_handler::<S, C>),
        )
        .route(
            "/api/v1/admin/professionals/:id/approve",
            post(approve_handler::<S, C>),
        )
        .route(
            "/api/v1/admin/professionals/:id/reject",
            post(reject_handler::<S, C>),
        )
        .route(
            "/api/v1/admin/professionals/:id/identity",
            post(identity_review_handler::<S, C>),
        )
        .route(
            "/api/v1/admin/professionals/:id/plan/activate",
            post(activate_plan_handler::<S, C>),
        )
        .route(
            "/api/v1/admin/consumers/:id/credits",
            post(fulfil_purchase_handler::<S, C>),
        )
        .route(
            "/api/v1/admin/reviews/:id",
            post(moderate_review_handler::<S, C>),
        )
        .route(
            "/api/v1/admin/subscriptions/expire",
            post(expire_handler::<S, C>),
        )
        .with_state(service)
}

fn require_session(headers: &HeaderMap) -> Result<Session, MarketplaceError> {
    Session::from_headers(headers).ok_or_else(|| MarketplaceError::unauthorized("sign in required"))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub profession: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl From<SearchParams> for SearchQuery {
    fn from(params: SearchParams) -> Self {
        let mut query = SearchQuery::for_profession(params.profession);
        query.language = params.language.filter(|value| !value.trim().is_empty());
        query.city = params.city.filter(|value| !value.trim().is_empty());
        if let (Some(lat), Some(lng)) = (params.lat, params.lng) {
            query = query.near(lat, lng);
        }
        query
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub count: usize,
    pub results: Vec<ProfessionalView>,
}

pub(crate) async fn search_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let results: Vec<ProfessionalView> = service
        .search(&params.into())?
        .iter()
        .map(|pro| ProfessionalView::for_viewer(pro, ContactAccess::Locked))
        .collect();
    Ok(Json(SearchResponse {
        count: results.len(),
        results,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
}

pub(crate) async fn register_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Professional>), MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    let pro = service.register_professional(&session, &request.name)?;
    Ok((StatusCode::CREATED, Json(pro)))
}

pub(crate) async fn profile_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ProfessionalView>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = Session::from_headers(&headers);
    let view = service.view_professional(session.as_ref(), &ProfessionalId(id), Utc::now())?;
    Ok(Json(view))
}

pub(crate) async fn save_profile_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfessionalView>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    let pro = service.save_profile(&session, &ProfessionalId(id), update, Utc::now())?;
    Ok(Json(ProfessionalView::for_viewer(&pro, ContactAccess::Owner)))
}

pub(crate) async fn submit_profile_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(translations): Json<ProfileTranslations>,
) -> Result<Json<ProfessionalView>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    let pro = service.submit_profile(&session, &ProfessionalId(id), translations, Utc::now())?;
    Ok(Json(ProfessionalView::for_viewer(&pro, ContactAccess::Owner)))
}

#[derive(Debug, Deserialize)]
pub struct IdentityDocumentsRequest {
    pub documents: Vec<String>,
}

pub(crate) async fn identity_documents_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<IdentityDocumentsRequest>,
) -> Result<(StatusCode, Json<ProfessionalView>), MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    let pro =
        service.submit_identity_documents(&session, &ProfessionalId(id), request.documents)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ProfessionalView::for_viewer(&pro, ContactAccess::Owner)),
    ))
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub plan: PlanTier,
    #[serde(default)]
    pub featured: bool,
}

pub(crate) async fn select_plan_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<CheckoutSession>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    let checkout = service.select_plan(
        &session,
        &ProfessionalId(id),
        request.plan,
        request.featured,
        Utc::now(),
    )?;
    Ok(Json(checkout))
}

pub(crate) async fn cancel_plan_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ProfessionalView>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    let pro = service.cancel_plan(&session, &ProfessionalId(id), Utc::now())?;
    Ok(Json(ProfessionalView::for_viewer(&pro, ContactAccess::Owner)))
}

pub(crate) async fn reactivate_plan_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ProfessionalView>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    let pro = service.reactivate_plan(&session, &ProfessionalId(id), Utc::now())?;
    Ok(Json(ProfessionalView::for_viewer(&pro, ContactAccess::Owner)))
}

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub professional_id: ProfessionalId,
}

pub(crate) async fn unlock_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Json(request): Json<UnlockRequest>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    let outcome = service.unlock(&session, &request.professional_id, Utc::now())?;
    let status = match outcome {
        UnlockOutcome::Unlocked { .. } => StatusCode::CREATED,
        UnlockOutcome::AlreadyUnlocked { .. } | UnlockOutcome::OwnProfile => StatusCode::OK,
    };
    Ok((status, Json(outcome)).into_response())
}

pub(crate) async fn unlocks_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
) -> Result<Json<Vec<UnlockToken>>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    Ok(Json(service.unlocked_professionals(&session)?))
}

pub(crate) async fn review_eligibility_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ReviewEligibility>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    let eligibility = service.can_review(&session, &ProfessionalId(id), Utc::now())?;
    Ok(Json(eligibility))
}

pub(crate) async fn public_reviews_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PublicReview>>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    Ok(Json(service.public_reviews(&ProfessionalId(id))?))
}

pub(crate) async fn submit_review_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Json(submission): Json<ReviewSubmission>,
) -> Result<(StatusCode, Json<AuthoredReview>), MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    let review = service.submit_review(&session, submission, Utc::now())?;
    Ok((StatusCode::CREATED, Json(AuthoredReview::from(&review))))
}

pub(crate) async fn my_reviews_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AuthoredReview>>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    Ok(Json(service.my_reviews(&session)?))
}

pub(crate) async fn pending_reviews_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PendingReview>>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    Ok(Json(service.pending_for_review(&session, Utc::now())?))
}

pub(crate) async fn account_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
) -> Result<Json<ConsumerAccount>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    Ok(Json(service.account(&session)?))
}

#[derive(Debug, Deserialize)]
pub struct CreditCheckoutRequest {
    pub pack: CreditPack,
}

pub(crate) async fn credit_checkout_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Json(request): Json<CreditCheckoutRequest>,
) -> Result<Json<CheckoutSession>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let session = require_session(&headers)?;
    Ok(Json(service.purchase(&session, request.pack)?))
}

#[derive(Debug, Serialize)]
pub struct ModerationQueue {
    pub profiles: Vec<Professional>,
    pub identity: Vec<Professional>,
    pub reviews: Vec<Review>,
}

pub(crate) async fn moderation_queue_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
) -> Result<Json<ModerationQueue>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let admin = require_session(&headers)?;
    Ok(Json(ModerationQueue {
        profiles: service.moderation_queue(&admin)?,
        identity: service.identity_queue(&admin)?,
        reviews: service.review_queue(&admin)?,
    }))
}

pub(crate) async fn approve_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Professional>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let admin = require_session(&headers)?;
    Ok(Json(service.approve_profile(
        &admin,
        &ProfessionalId(id),
        Utc::now(),
    )?))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

pub(crate) async fn reject_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<Professional>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let admin = require_session(&headers)?;
    Ok(Json(service.reject_profile(
        &admin,
        &ProfessionalId(id),
        &request.reason,
        Utc::now(),
    )?))
}

#[derive(Debug, Deserialize)]
pub struct IdentityReviewRequest {
    pub verified: bool,
}

pub(crate) async fn identity_review_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<IdentityReviewRequest>,
) -> Result<Json<Professional>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let admin = require_session(&headers)?;
    Ok(Json(service.review_identity(
        &admin,
        &ProfessionalId(id),
        request.verified,
    )?))
}

pub(crate) async fn activate_plan_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<Professional>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    require_session(&headers)?.require_admin()?;
    Ok(Json(service.activate_plan(
        &ProfessionalId(id),
        request.plan,
        request.featured,
        Utc::now(),
    )?))
}

pub(crate) async fn fulfil_purchase_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<CreditCheckoutRequest>,
) -> Result<Json<serde_json::Value>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    require_session(&headers)?.require_admin()?;
    let balance = service.fulfil_purchase(&ConsumerId(id.clone()), request.pack, Utc::now())?;
    Ok(Json(json!({ "consumer_id": id, "credits": balance })))
}

#[derive(Debug, Deserialize)]
pub struct ModerateReviewRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub testimony: Option<String>,
}

pub(crate) async fn moderate_review_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<ModerateReviewRequest>,
) -> Result<Json<Review>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    let admin = require_session(&headers)?;
    Ok(Json(service.moderate_review(
        &admin,
        &ReviewId(id),
        request.decision,
        request.testimony,
    )?))
}

pub(crate) async fn expire_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    require_session(&headers)?.require_admin()?;
    let expired = service.expire_lapsed(Utc::now())?;
    Ok(Json(json!({ "expired": expired })))
}
