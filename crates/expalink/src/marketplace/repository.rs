use chrono::{DateTime, Utc};

use super::domain::{
    BioVerificationStatus, ConsumerAccount, ConsumerId, NewReview, PlanStatus, Professional,
    ProfessionalId, Review, ReviewId, UnlockToken, VerificationStatus,
};

/// Containment filters pushed down to the professional store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    /// Exact tag that must appear in the professions list.
    pub profession: Option<String>,
    pub language: Option<String>,
    /// Exact (already normalised) city that must appear in the cities list.
    pub city: Option<String>,
    pub online_only: bool,
}

impl DirectoryFilter {
    pub fn matches(&self, pro: &Professional) -> bool {
        if self.online_only
            && !(pro.is_profile_online
                && pro.bio_verification_status == BioVerificationStatus::Approved)
        {
            return false;
        }
        if let Some(profession) = &self.profession {
            if !pro.professions.iter().any(|tag| tag == profession) {
                return false;
            }
        }
        if let Some(language) = &self.language {
            if !pro.languages.iter().any(|tag| tag == language) {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !pro.cities.iter().any(|name| name == city) {
                return false;
            }
        }
        true
    }
}

/// Storage abstraction for professional records.
pub trait ProfessionalRepository: Send + Sync {
    fn insert_professional(&self, pro: Professional) -> Result<Professional, RepositoryError>;
    fn update_professional(&self, pro: Professional) -> Result<(), RepositoryError>;
    fn fetch_professional(
        &self,
        id: &ProfessionalId,
    ) -> Result<Option<Professional>, RepositoryError>;
    /// Matching records, featured first.
    fn find_professionals(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<Professional>, RepositoryError>;
    fn with_plan_status(&self, status: PlanStatus) -> Result<Vec<Professional>, RepositoryError>;
    fn pending_moderation(&self) -> Result<Vec<Professional>, RepositoryError>;
    fn with_identity_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<Professional>, RepositoryError>;
    /// Atomic `unlock_count += 1`, returning the new count.
    fn increment_unlock_count(&self, id: &ProfessionalId) -> Result<u64, RepositoryError>;
}

/// Unlock tokens keyed by (consumer, professional) with a uniqueness constraint.
pub trait UnlockRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the pair already exists.
    fn insert_unlock(&self, token: UnlockToken) -> Result<UnlockToken, RepositoryError>;
    fn fetch_unlock(
        &self,
        consumer: &ConsumerId,
        professional: &ProfessionalId,
    ) -> Result<Option<UnlockToken>, RepositoryError>;
    fn unlocks_for(&self, consumer: &ConsumerId) -> Result<Vec<UnlockToken>, RepositoryError>;
    /// Compensation for a token whose charge could not be applied.
    fn revoke_unlock(
        &self,
        consumer: &ConsumerId,
        professional: &ProfessionalId,
    ) -> Result<(), RepositoryError>;
}

pub trait ReviewRepository: Send + Sync {
    /// Assigns the id and stores the review as pending. Fails with
    /// [`RepositoryError::Conflict`] when the author already has a pending or verified
    /// review of the same professional.
    fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError>;
    fn update_review(&self, review: Review) -> Result<(), RepositoryError>;
    fn fetch_review(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
    fn reviews_for_professional(
        &self,
        professional: &ProfessionalId,
    ) -> Result<Vec<Review>, RepositoryError>;
    fn reviews_by_author(&self, author: &ConsumerId) -> Result<Vec<Review>, RepositoryError>;
    /// Newest first.
    fn all_reviews(&self) -> Result<Vec<Review>, RepositoryError>;
}

/// Consumer accounts and their credit balances.
pub trait AccountRepository: Send + Sync {
    fn fetch_account(&self, id: &ConsumerId) -> Result<Option<ConsumerAccount>, RepositoryError>;
    fn upsert_account(&self, account: ConsumerAccount) -> Result<(), RepositoryError>;
    /// Conditional decrement: `credits -= 1 WHERE credits >= 1`.
    /// Returns the remaining balance, or `None` when nothing was debited.
    fn try_debit_credit(&self, id: &ConsumerId) -> Result<Option<u32>, RepositoryError>;
    /// Atomic increment, returning the new balance.
    fn grant_credits(&self, id: &ConsumerId, amount: u32) -> Result<u32, RepositoryError>;
    fn set_premium_until(
        &self,
        id: &ConsumerId,
        until: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

/// Everything the marketplace services persist through.
pub trait MarketplaceStore:
    ProfessionalRepository + UnlockRepository + ReviewRepository + AccountRepository
{
}

impl<T> MarketplaceStore for T where
    T: ProfessionalRepository + UnlockRepository + ReviewRepository + AccountRepository
{
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
