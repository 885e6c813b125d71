use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::completion::completion_score;
use super::domain::{
    BioVerificationStatus, ContactDetails, ConsumerId, Gender, PlanStatus, PlanTier,
    Professional, ProfessionalId, Review, ReviewId, ReviewStatus, VerificationStatus,
};

/// How much of the private record a viewer may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactAccess {
    Locked,
    Unlocked,
    Owner,
}

/// Profile as rendered for one viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfessionalView {
    pub id: ProfessionalId,
    pub name: String,
    pub gender: Gender,
    pub nationalities: Vec<String>,
    pub image_url: Option<String>,
    pub professions: Vec<String>,
    pub specialties: Vec<String>,
    pub cities: Vec<String>,
    pub languages: Vec<String>,
    pub years_of_experience: Option<u16>,
    pub bio: String,
    pub bios: BTreeMap<String, String>,
    pub specialty_translations: BTreeMap<String, BTreeMap<String, String>>,
    pub verified: bool,
    pub is_featured: bool,
    pub is_online: bool,
    pub rating: f32,
    pub review_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub access: ContactAccess,
    /// Present only for the owner or a consumer holding an unlock.
    pub contact: Option<ContactDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<OwnerDashboard>,
}

/// Status panel shown to the profile owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerDashboard {
    pub completion: u8,
    pub is_pro_complete: bool,
    pub bio_verification_status: BioVerificationStatus,
    pub bio_rejection_reason: Option<String>,
    pub verification_status: VerificationStatus,
    pub plan: Option<PlanTier>,
    pub plan_status: Option<PlanStatus>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub unlock_count: u64,
}

impl ProfessionalView {
    pub fn for_viewer(pro: &Professional, access: ContactAccess) -> Self {
        let contact = match access {
            ContactAccess::Locked => None,
            ContactAccess::Unlocked | ContactAccess::Owner => Some(pro.contact.clone()),
        };
        let dashboard = (access == ContactAccess::Owner).then(|| OwnerDashboard {
            completion: completion_score(pro),
            is_pro_complete: pro.is_pro_complete,
            bio_verification_status: pro.bio_verification_status,
            bio_rejection_reason: pro.bio_rejection_reason.clone(),
            verification_status: pro.verification_status,
            plan: pro.plan,
            plan_status: pro.plan_status,
            subscription_ends_at: pro.subscription_ends_at,
            unlock_count: pro.unlock_count,
        });

        Self {
            id: pro.id.clone(),
            name: pro.name.clone(),
            gender: pro.gender,
            nationalities: pro.nationalities.clone(),
            image_url: pro.image_url.clone(),
            professions: pro.professions.clone(),
            specialties: pro.specialties.clone(),
            cities: pro.cities.clone(),
            languages: pro.languages.clone(),
            years_of_experience: pro.years_of_experience,
            bio: pro.bio.clone(),
            bios: pro.bios.clone(),
            specialty_translations: pro.specialty_translations.clone(),
            verified: pro.verified,
            is_featured: pro.is_featured,
            is_online: pro.is_profile_online,
            rating: pro.rating,
            review_count: pro.review_count,
            distance_km: pro.distance_km,
            access,
            contact,
            dashboard,
        }
    }
}

/// Verified review as shown on a profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicReview {
    pub id: ReviewId,
    pub stars: u8,
    pub testimony: String,
    pub service_type: String,
    /// Hidden when the author asked for anonymity.
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Review> for PublicReview {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id.clone(),
            stars: review.stars,
            testimony: review.testimony.clone(),
            service_type: review.service_type.clone(),
            author_name: if review.is_anonymous {
                None
            } else {
                review.author_name.clone()
            },
            created_at: review.created_at,
        }
    }
}

/// A review as its author sees it, whatever the moderation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthoredReview {
    pub id: ReviewId,
    pub professional_id: ProfessionalId,
    pub author_id: ConsumerId,
    pub stars: u8,
    pub testimony: String,
    pub service_type: String,
    pub is_anonymous: bool,
    pub status: ReviewStatus,
    pub struck_through: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Review> for AuthoredReview {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id.clone(),
            professional_id: review.professional_id.clone(),
            author_id: review.author_id.clone(),
            stars: review.stars,
            testimony: review.testimony.clone(),
            service_type: review.service_type.clone(),
            is_anonymous: review.is_anonymous,
            status: review.status,
            struck_through: review.status == ReviewStatus::Rejected,
            created_at: review.created_at,
        }
    }
}
