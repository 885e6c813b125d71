use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    NewReview, ProfessionalId, Review, ReviewId, ReviewStatus, UnlockToken, DEFAULT_RATING,
};
use super::error::MarketplaceError;
use super::repository::{MarketplaceStore, RepositoryError};
use super::service::MarketplaceService;
use super::session::Session;
use super::subscription::CheckoutGateway;
use super::views::{AuthoredReview, PublicReview};

pub const MIN_TESTIMONY_CHARS: usize = 20;
pub const FALLBACK_SERVICE_TYPE: &str = "Expert";

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewEligibility {
    pub eligible: bool,
    pub remaining_days: i64,
}

/// Cooldown and exclusivity check for one (consumer, professional) pair.
///
/// `existing` holds the pair's reviews; any pending or verified one blocks a new submission.
pub fn review_eligibility(
    unlocked_at: DateTime<Utc>,
    existing: &[Review],
    now: DateTime<Utc>,
    wait_days: i64,
) -> ReviewEligibility {
    let remaining_ms =
        Duration::days(wait_days).num_milliseconds() - (now - unlocked_at).num_milliseconds();
    let remaining_days = if remaining_ms <= 0 {
        0
    } else {
        (remaining_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    };
    let blocked = existing.iter().any(|review| review.status.is_active());

    ReviewEligibility {
        eligible: remaining_ms <= 0 && !blocked,
        remaining_days,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewSubmission {
    pub professional_id: ProfessionalId,
    pub stars: u8,
    pub testimony: String,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Verify,
    Reject,
}

/// Unlocked professional awaiting the caller's review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingReview {
    pub professional_id: ProfessionalId,
    pub professional_name: String,
    pub unlocked_at: DateTime<Utc>,
    pub eligibility: ReviewEligibility,
}

fn duplicate_review() -> MarketplaceError {
    MarketplaceError::Conflict("an active review already exists for this professional".to_string())
}

/// Mean of verified stars and their count.
pub fn rating_aggregate(reviews: &[Review]) -> (f32, u32) {
    let stars: Vec<u32> = reviews
        .iter()
        .filter(|review| review.status == ReviewStatus::Verified)
        .map(|review| u32::from(review.stars))
        .collect();
    if stars.is_empty() {
        return (DEFAULT_RATING, 0);
    }
    let count = stars.len() as u32;
    let total: u32 = stars.iter().sum();
    (total as f32 / count as f32, count)
}

impl<S, C> MarketplaceService<S, C>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    fn require_unlock(
        &self,
        session: &Session,
        professional_id: &ProfessionalId,
    ) -> Result<UnlockToken, MarketplaceError> {
        self.store
            .fetch_unlock(&session.consumer_id, professional_id)?
            .ok_or_else(|| {
                MarketplaceError::unauthorized("reviews require unlocked contact details")
            })
    }

    fn pair_reviews(
        &self,
        session: &Session,
        professional_id: &ProfessionalId,
    ) -> Result<Vec<Review>, MarketplaceError> {
        Ok(self
            .store
            .reviews_by_author(&session.consumer_id)?
            .into_iter()
            .filter(|review| &review.professional_id == professional_id)
            .collect())
    }

    pub fn can_review(
        &self,
        session: &Session,
        professional_id: &ProfessionalId,
        now: DateTime<Utc>,
    ) -> Result<ReviewEligibility, MarketplaceError> {
        let token = self.require_unlock(session, professional_id)?;
        let existing = self.pair_reviews(session, professional_id)?;
        Ok(review_eligibility(
            token.unlocked_at,
            &existing,
            now,
            self.config.review_wait_days,
        ))
    }

    pub fn submit_review(
        &self,
        session: &Session,
        submission: ReviewSubmission,
        now: DateTime<Utc>,
    ) -> Result<Review, MarketplaceError> {
        let ReviewSubmission {
            professional_id,
            stars,
            testimony,
            service_type,
            is_anonymous,
        } = submission;

        let token = self.require_unlock(session, &professional_id)?;
        if !(1..=5).contains(&stars) {
            return Err(MarketplaceError::validation("stars must be between 1 and 5"));
        }
        let testimony = testimony.trim().to_string();
        if testimony.chars().count() < MIN_TESTIMONY_CHARS {
            return Err(MarketplaceError::validation(format!(
                "testimony must be at least {MIN_TESTIMONY_CHARS} characters"
            )));
        }

        let existing = self.pair_reviews(session, &professional_id)?;
        if existing.iter().any(|review| review.status.is_active()) {
            return Err(duplicate_review());
        }
        let eligibility = review_eligibility(
            token.unlocked_at,
            &existing,
            now,
            self.config.review_wait_days,
        );
        if !eligibility.eligible {
            return Err(MarketplaceError::validation(format!(
                "reviews open in {} day(s)",
                eligibility.remaining_days
            )));
        }

        let pro = self.load_professional(&professional_id)?;
        let service_type = service_type
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .or_else(|| pro.primary_profession().map(str::to_string))
            .unwrap_or_else(|| FALLBACK_SERVICE_TYPE.to_string());
        let author_name = self.account_for(session)?.full_name;

        let review = self
            .store
            .insert_review(NewReview {
                professional_id,
                author_id: session.consumer_id.clone(),
                author_name,
                stars,
                testimony,
                service_type,
                is_anonymous,
                created_at: now,
            })
            .map_err(|error| match error {
                RepositoryError::Conflict => duplicate_review(),
                other => other.into(),
            })?;

        info!(review = %review.id.0, professional = %review.professional_id.0, "review submitted");
        Ok(review)
    }

    /// Admin decision on a pending review; the professional's rating is recomputed afterwards.
    pub fn moderate_review(
        &self,
        admin: &Session,
        review_id: &ReviewId,
        decision: ReviewDecision,
        edited_text: Option<String>,
    ) -> Result<Review, MarketplaceError> {
        admin.require_admin()?;

        let mut review = self
            .store
            .fetch_review(review_id)?
            .ok_or_else(|| MarketplaceError::NotFound(format!("review {}", review_id.0)))?;
        if review.status != ReviewStatus::Pending {
            return Err(MarketplaceError::Conflict(format!(
                "review is already {}",
                review.status.label()
            )));
        }

        match decision {
            ReviewDecision::Verify => {
                if let Some(text) = edited_text {
                    let text = text.trim().to_string();
                    if text.chars().count() < MIN_TESTIMONY_CHARS {
                        return Err(MarketplaceError::validation(format!(
                            "testimony must be at least {MIN_TESTIMONY_CHARS} characters"
                        )));
                    }
                    review.testimony = text;
                }
                review.status = ReviewStatus::Verified;
            }
            ReviewDecision::Reject => {
                if edited_text.is_some() {
                    return Err(MarketplaceError::validation(
                        "testimony can only be edited when verifying",
                    ));
                }
                review.status = ReviewStatus::Rejected;
            }
        }

        self.store.update_review(review.clone())?;
        self.refresh_rating(&review.professional_id)?;

        info!(review = %review.id.0, status = review.status.label(), "review moderated");
        Ok(review)
    }

    fn refresh_rating(&self, professional_id: &ProfessionalId) -> Result<(), MarketplaceError> {
        let reviews = self.store.reviews_for_professional(professional_id)?;
        let (rating, count) = rating_aggregate(&reviews);
        let mut pro = self.load_professional(professional_id)?;
        pro.rating = rating;
        pro.review_count = count;
        self.store.update_professional(pro)?;
        Ok(())
    }

    pub fn public_reviews(
        &self,
        professional_id: &ProfessionalId,
    ) -> Result<Vec<PublicReview>, MarketplaceError> {
        Ok(self
            .store
            .reviews_for_professional(professional_id)?
            .iter()
            .filter(|review| review.status == ReviewStatus::Verified)
            .map(PublicReview::from)
            .collect())
    }

    pub fn my_reviews(&self, session: &Session) -> Result<Vec<AuthoredReview>, MarketplaceError> {
        Ok(self
            .store
            .reviews_by_author(&session.consumer_id)?
            .iter()
            .map(AuthoredReview::from)
            .collect())
    }

    pub fn pending_for_review(
        &self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingReview>, MarketplaceError> {
        let authored = self.store.reviews_by_author(&session.consumer_id)?;
        let mut pending = Vec::new();
        for token in self.store.unlocks_for(&session.consumer_id)? {
            let existing: Vec<Review> = authored
                .iter()
                .filter(|review| review.professional_id == token.professional_id)
                .cloned()
                .collect();
            if existing.iter().any(|review| review.status.is_active()) {
                continue;
            }
            let Some(pro) = self.store.fetch_professional(&token.professional_id)? else {
                continue;
            };
            pending.push(PendingReview {
                professional_id: token.professional_id,
                professional_name: pro.name,
                unlocked_at: token.unlocked_at,
                eligibility: review_eligibility(
                    token.unlocked_at,
                    &existing,
                    now,
                    self.config.review_wait_days,
                ),
            });
        }
        Ok(pending)
    }

    /// Newest pending reviews for the moderation screen.
    pub fn review_queue(&self, admin: &Session) -> Result<Vec<Review>, MarketplaceError> {
        admin.require_admin()?;
        Ok(self
            .store
            .all_reviews()?
            .into_iter()
            .filter(|review| review.status == ReviewStatus::Pending)
            .collect())
    }
}
