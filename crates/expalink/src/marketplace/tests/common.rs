use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::MarketplaceConfig;
use crate::marketplace::domain::{
    ConsumerAccount, ConsumerId, NewReview, PlanStatus, PlanTier, Professional, ProfessionalId,
    Review, ReviewId, UnlockToken, VerificationStatus,
};
use crate::marketplace::repository::{
    AccountRepository, DirectoryFilter, ProfessionalRepository, RepositoryError,
    ReviewRepository, UnlockRepository,
};
use crate::marketplace::session::Session;
use crate::marketplace::store::InMemoryStore;
use crate::marketplace::subscription::{
    CheckoutError, CheckoutGateway, CheckoutRequest, CheckoutSession,
};
use crate::marketplace::{marketplace_router, visibility, MarketplaceService};

pub(super) const MADRID: (f64, f64) = (40.4168, -3.7038);

/// Kilometres per degree of latitude on the haversine sphere.
const KM_PER_DEGREE: f64 = 111.194_926_644_558_73;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Point `km` due north of Madrid.
pub(super) fn north_of_madrid(km: f64) -> (f64, f64) {
    (MADRID.0 + km / KM_PER_DEGREE, MADRID.1)
}

#[derive(Debug, Default)]
pub(super) struct RecordingCheckout {
    requests: Mutex<Vec<CheckoutRequest>>,
}

impl RecordingCheckout {
    pub(super) fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().expect("checkout mutex poisoned").clone()
    }
}

impl CheckoutGateway for RecordingCheckout {
    fn create_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, CheckoutError> {
        let mut guard = self.requests.lock().expect("checkout mutex poisoned");
        guard.push(request);
        Ok(CheckoutSession {
            url: format!("https://checkout.test/session/{}", guard.len()),
        })
    }
}

#[derive(Debug, Default)]
pub(super) struct OfflineCheckout;

impl CheckoutGateway for OfflineCheckout {
    fn create_session(&self, _request: CheckoutRequest) -> Result<CheckoutSession, CheckoutError> {
        Err(CheckoutError::Unavailable("connection refused".to_string()))
    }
}

pub(super) type TestService = MarketplaceService<InMemoryStore, RecordingCheckout>;

pub(super) fn build_service() -> (TestService, Arc<InMemoryStore>, Arc<RecordingCheckout>) {
    let store = Arc::new(InMemoryStore::new());
    let checkout = Arc::new(RecordingCheckout::default());
    let service = MarketplaceService::new(
        store.clone(),
        checkout.clone(),
        MarketplaceConfig::default(),
    )
    .with_return_url("https://expalink.test/");
    (service, store, checkout)
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    marketplace_router(Arc::new(service))
}

/// Record scoring 100% that has not been submitted.
pub(super) fn complete_profile(id: &str, profession: &str) -> Professional {
    let mut pro = Professional::new(ProfessionalId(id.to_string()), format!("Pro {id}"));
    pro.image_url = Some(format!("https://cdn.example/{id}.jpg"));
    pro.nationalities = vec!["ES".to_string()];
    pro.contact.phone = Some("+34 600 123 456".to_string());
    pro.contact.email = Some(format!("{id}@pros.example"));
    pro.professions = vec![profession.to_string()];
    pro.specialties = vec!["Emergency call-outs".to_string()];
    pro.cities = vec!["Madrid".to_string()];
    pro.languages = vec!["English".to_string(), "Spanish".to_string()];
    pro.years_of_experience = Some(10);
    pro.bio = "Bilingual professional working with expat families.".to_string();
    pro
}

/// Submitted, approved and on an active monthly plan.
pub(super) fn online_professional(
    id: &str,
    profession: &str,
    coordinates: Option<(f64, f64)>,
) -> Professional {
    let mut pro = complete_profile(id, profession);
    if let Some((lat, lng)) = coordinates {
        pro.latitude = Some(lat);
        pro.longitude = Some(lng);
    }
    visibility::submit(&mut pro, now()).expect("submits");
    visibility::approve(&mut pro, now()).expect("approves");
    visibility::activate_plan(&mut pro, PlanTier::Monthly, false, now());
    assert!(pro.is_profile_online);
    pro
}

pub(super) fn seed(store: &InMemoryStore, pro: Professional) -> Professional {
    store.insert_professional(pro).expect("seed professional")
}

pub(super) fn consumer(id: &str) -> Session {
    Session::consumer(id, format!("{id}@expats.example"))
}

pub(super) fn admin() -> Session {
    Session::admin("admin-1", "ops@expalink.test")
}

pub(super) fn fund(store: &InMemoryStore, session: &Session, credits: u32) {
    let mut account = ConsumerAccount::new(session.consumer_id.clone(), session.email.clone());
    account.full_name = Some(format!("Consumer {}", session.consumer_id.0));
    account.credits = credits;
    store.upsert_account(account).expect("seed account");
}

pub(super) fn balance(store: &InMemoryStore, session: &Session) -> u32 {
    store
        .fetch_account(&session.consumer_id)
        .expect("account lookup")
        .map(|account| account.credits)
        .unwrap_or(0)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store whose conditional debit always loses the race.
#[derive(Default)]
pub(super) struct DrainedBalanceStore {
    pub(super) inner: InMemoryStore,
}

impl ProfessionalRepository for DrainedBalanceStore {
    fn insert_professional(&self, pro: Professional) -> Result<Professional, RepositoryError> {
        self.inner.insert_professional(pro)
    }

    fn update_professional(&self, pro: Professional) -> Result<(), RepositoryError> {
        self.inner.update_professional(pro)
    }

    fn fetch_professional(
        &self,
        id: &ProfessionalId,
    ) -> Result<Option<Professional>, RepositoryError> {
        self.inner.fetch_professional(id)
    }

    fn find_professionals(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<Professional>, RepositoryError> {
        self.inner.find_professionals(filter)
    }

    fn with_plan_status(&self, status: PlanStatus) -> Result<Vec<Professional>, RepositoryError> {
        self.inner.with_plan_status(status)
    }

    fn pending_moderation(&self) -> Result<Vec<Professional>, RepositoryError> {
        self.inner.pending_moderation()
    }

    fn with_identity_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<Professional>, RepositoryError> {
        self.inner.with_identity_status(status)
    }

    fn increment_unlock_count(&self, _id: &ProfessionalId) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("counter offline".to_string()))
    }
}

impl UnlockRepository for DrainedBalanceStore {
    fn insert_unlock(&self, token: UnlockToken) -> Result<UnlockToken, RepositoryError> {
        self.inner.insert_unlock(token)
    }

    fn fetch_unlock(
        &self,
        consumer: &ConsumerId,
        professional: &ProfessionalId,
    ) -> Result<Option<UnlockToken>, RepositoryError> {
        self.inner.fetch_unlock(consumer, professional)
    }

    fn unlocks_for(&self, consumer: &ConsumerId) -> Result<Vec<UnlockToken>, RepositoryError> {
        self.inner.unlocks_for(consumer)
    }

    fn revoke_unlock(
        &self,
        consumer: &ConsumerId,
        professional: &ProfessionalId,
    ) -> Result<(), RepositoryError> {
        self.inner.revoke_unlock(consumer, professional)
    }
}

impl ReviewRepository for DrainedBalanceStore {
    fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        self.inner.insert_review(review)
    }

    fn update_review(&self, review: Review) -> Result<(), RepositoryError> {
        self.inner.update_review(review)
    }

    fn fetch_review(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        self.inner.fetch_review(id)
    }

    fn reviews_for_professional(
        &self,
        professional: &ProfessionalId,
    ) -> Result<Vec<Review>, RepositoryError> {
        self.inner.reviews_for_professional(professional)
    }

    fn reviews_by_author(&self, author: &ConsumerId) -> Result<Vec<Review>, RepositoryError> {
        self.inner.reviews_by_author(author)
    }

    fn all_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        self.inner.all_reviews()
    }
}

impl AccountRepository for DrainedBalanceStore {
    fn fetch_account(&self, id: &ConsumerId) -> Result<Option<ConsumerAccount>, RepositoryError> {
        self.inner.fetch_account(id)
    }

    fn upsert_account(&self, account: ConsumerAccount) -> Result<(), RepositoryError> {
        self.inner.upsert_account(account)
    }

    fn try_debit_credit(&self, _id: &ConsumerId) -> Result<Option<u32>, RepositoryError> {
        Ok(None)
    }

    fn grant_credits(&self, id: &ConsumerId, amount: u32) -> Result<u32, RepositoryError> {
        self.inner.grant_credits(id, amount)
    }

    fn set_premium_until(
        &self,
        id: &ConsumerId,
        until: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.inner.set_premium_until(id, until)
    }
}
