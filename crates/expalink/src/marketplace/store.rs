use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    BioVerificationStatus, ConsumerAccount, ConsumerId, NewReview, PlanStatus, Professional,
    ProfessionalId, Review, ReviewId, UnlockToken, VerificationStatus,
};
use super::repository::{
    AccountRepository, DirectoryFilter, ProfessionalRepository, RepositoryError,
    ReviewRepository, UnlockRepository,
};

type UnlockKey = (ConsumerId, ProfessionalId);

/// Process-local store backing every repository trait. Clones share state.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    professionals: Arc<Mutex<HashMap<ProfessionalId, Professional>>>,
    unlocks: Arc<Mutex<HashMap<UnlockKey, UnlockToken>>>,
    reviews: Arc<Mutex<HashMap<ReviewId, Review>>>,
    review_sequence: Arc<AtomicU64>,
    accounts: Arc<Mutex<HashMap<ConsumerId, ConsumerAccount>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn professional_count(&self) -> usize {
        self.professionals.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, table: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{table} mutex poisoned")))
}

fn featured_first(mut records: Vec<Professional>) -> Vec<Professional> {
    records.sort_by(|a, b| {
        b.is_featured
            .cmp(&a.is_featured)
            .then_with(|| a.id.cmp(&b.id))
    });
    records
}

impl ProfessionalRepository for InMemoryStore {
    fn insert_professional(&self, pro: Professional) -> Result<Professional, RepositoryError> {
        let mut guard = lock(&self.professionals, "professional")?;
        if guard.contains_key(&pro.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(pro.id.clone(), pro.clone());
        Ok(pro)
    }

    fn update_professional(&self, mut pro: Professional) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.professionals, "professional")?;
        match guard.get(&pro.id) {
            Some(existing) => {
                // Counter is owned by `increment_unlock_count`.
                pro.unlock_count = existing.unlock_count;
                pro.distance_km = None;
                guard.insert(pro.id.clone(), pro);
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_professional(
        &self,
        id: &ProfessionalId,
    ) -> Result<Option<Professional>, RepositoryError> {
        let guard = lock(&self.professionals, "professional")?;
        Ok(guard.get(id).cloned())
    }

    fn find_professionals(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<Professional>, RepositoryError> {
        let guard = lock(&self.professionals, "professional")?;
        Ok(featured_first(
            guard
                .values()
                .filter(|pro| filter.matches(pro))
                .cloned()
                .collect(),
        ))
    }

    fn with_plan_status(&self, status: PlanStatus) -> Result<Vec<Professional>, RepositoryError> {
        let guard = lock(&self.professionals, "professional")?;
        Ok(featured_first(
            guard
                .values()
                .filter(|pro| pro.plan_status == Some(status))
                .cloned()
                .collect(),
        ))
    }

    fn pending_moderation(&self) -> Result<Vec<Professional>, RepositoryError> {
        let guard = lock(&self.professionals, "professional")?;
        let mut records: Vec<Professional> = guard
            .values()
            .filter(|pro| {
                pro.is_pro_complete
                    && pro.bio_verification_status == BioVerificationStatus::Pending
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn with_identity_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<Professional>, RepositoryError> {
        let guard = lock(&self.professionals, "professional")?;
        let mut records: Vec<Professional> = guard
            .values()
            .filter(|pro| pro.verification_status == status)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn increment_unlock_count(&self, id: &ProfessionalId) -> Result<u64, RepositoryError> {
        let mut guard = lock(&self.professionals, "professional")?;
        let pro = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        pro.unlock_count += 1;
        Ok(pro.unlock_count)
    }
}

impl UnlockRepository for InMemoryStore {
    fn insert_unlock(&self, token: UnlockToken) -> Result<UnlockToken, RepositoryError> {
        let mut guard = lock(&self.unlocks, "unlock")?;
        let key = (token.consumer_id.clone(), token.professional_id.clone());
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, token.clone());
        Ok(token)
    }

    fn fetch_unlock(
        &self,
        consumer: &ConsumerId,
        professional: &ProfessionalId,
    ) -> Result<Option<UnlockToken>, RepositoryError> {
        let guard = lock(&self.unlocks, "unlock")?;
        Ok(guard
            .get(&(consumer.clone(), professional.clone()))
            .cloned())
    }

    fn unlocks_for(&self, consumer: &ConsumerId) -> Result<Vec<UnlockToken>, RepositoryError> {
        let guard = lock(&self.unlocks, "unlock")?;
        let mut tokens: Vec<UnlockToken> = guard
            .values()
            .filter(|token| &token.consumer_id == consumer)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.unlocked_at.cmp(&a.unlocked_at));
        Ok(tokens)
    }

    fn revoke_unlock(
        &self,
        consumer: &ConsumerId,
        professional: &ProfessionalId,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.unlocks, "unlock")?;
        guard
            .remove(&(consumer.clone(), professional.clone()))
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl ReviewRepository for InMemoryStore {
    fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let mut guard = lock(&self.reviews, "review")?;
        let duplicate = guard.values().any(|existing| {
            existing.author_id == review.author_id
                && existing.professional_id == review.professional_id
                && existing.status.is_active()
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let number = self.review_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let stored = review.into_review(ReviewId(format!("rev-{number:06}")));
        guard.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn update_review(&self, review: Review) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.reviews, "review")?;
        if guard.contains_key(&review.id) {
            guard.insert(review.id.clone(), review);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch_review(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let guard = lock(&self.reviews, "review")?;
        Ok(guard.get(id).cloned())
    }

    fn reviews_for_professional(
        &self,
        professional: &ProfessionalId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let guard = lock(&self.reviews, "review")?;
        Ok(newest_first(
            guard
                .values()
                .filter(|review| &review.professional_id == professional)
                .cloned()
                .collect(),
        ))
    }

    fn reviews_by_author(&self, author: &ConsumerId) -> Result<Vec<Review>, RepositoryError> {
        let guard = lock(&self.reviews, "review")?;
        Ok(newest_first(
            guard
                .values()
                .filter(|review| &review.author_id == author)
                .cloned()
                .collect(),
        ))
    }

    fn all_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        let guard = lock(&self.reviews, "review")?;
        Ok(newest_first(guard.values().cloned().collect()))
    }
}

fn newest_first(mut reviews: Vec<Review>) -> Vec<Review> {
    reviews.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    reviews
}

impl AccountRepository for InMemoryStore {
    fn fetch_account(&self, id: &ConsumerId) -> Result<Option<ConsumerAccount>, RepositoryError> {
        let guard = lock(&self.accounts, "account")?;
        Ok(guard.get(id).cloned())
    }

    fn upsert_account(&self, account: ConsumerAccount) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.accounts, "account")?;
        guard.insert(account.id.clone(), account);
        Ok(())
    }

    fn try_debit_credit(&self, id: &ConsumerId) -> Result<Option<u32>, RepositoryError> {
        let mut guard = lock(&self.accounts, "account")?;
        let account = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if account.credits == 0 {
            return Ok(None);
        }
        account.credits -= 1;
        Ok(Some(account.credits))
    }

    fn grant_credits(&self, id: &ConsumerId, amount: u32) -> Result<u32, RepositoryError> {
        let mut guard = lock(&self.accounts, "account")?;
        let account = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        account.credits = account.credits.saturating_add(amount);
        Ok(account.credits)
    }

    fn set_premium_until(
        &self,
        id: &ConsumerId,
        until: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.accounts, "account")?;
        let account = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        account.is_premium = true;
        account.premium_until = Some(until);
        Ok(())
    }
}
