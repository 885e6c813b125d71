//! Marketplace core: professionals, search, unlocks, reviews and subscriptions.

pub mod completion;
pub mod domain;
pub mod error;
pub mod geo;
pub mod profile;
pub mod repository;
pub mod reviews;
pub mod router;
pub mod search;
pub mod service;
pub mod session;
pub mod store;
pub mod subscription;
pub mod unlock;
pub mod views;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use completion::{completion_score, SUBMISSION_THRESHOLD, VISIBILITY_THRESHOLD};
pub use domain::{
    BioVerificationStatus, ConsumerAccount, ConsumerId, ContactDetails, Gender, GeoPoint,
    NewReview, PlanStatus, PlanTier, Professional, ProfessionalId, Review, ReviewId,
    ReviewStatus, UnlockToken, VerificationStatus, DEFAULT_RATING,
};
pub use error::MarketplaceError;
pub use geo::haversine_distance_km;
pub use profile::{ProfileTranslations, ProfileUpdate};
pub use repository::{
    AccountRepository, DirectoryFilter, MarketplaceStore, ProfessionalRepository,
    RepositoryError, ReviewRepository, UnlockRepository,
};
pub use reviews::{review_eligibility, ReviewDecision, ReviewEligibility, ReviewSubmission};
pub use router::marketplace_router;
pub use search::{rank, title_case, SearchQuery};
pub use service::MarketplaceService;
pub use session::Session;
pub use store::InMemoryStore;
pub use subscription::{
    CheckoutError, CheckoutGateway, CheckoutItem, CheckoutMode, CheckoutRequest,
    CheckoutSession, CreditPack,
};
pub use unlock::UnlockOutcome;
pub use views::{ContactAccess, ProfessionalView};
pub use visibility::{PlanState, ProfileReadiness, VisibilityState};
