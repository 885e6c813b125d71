use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for professional records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProfessionalId(pub String);

/// Identifier wrapper for consumer accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsumerId(pub String);

impl ConsumerId {
    /// Professionals and consumers share the account id space.
    pub fn owns(&self, professional: &ProfessionalId) -> bool {
        self.0 == professional.0
    }
}

/// Identifier wrapper for reviews.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Female,
    Male,
    #[default]
    PreferNotToSay,
}

/// Identity-document review status. Earns the badge, never gates visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    None,
    Pending,
    Verified,
    Rejected,
}

/// Content moderation of the biography and profile claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BioVerificationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Subscription tier for professionals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Founding,
    Monthly,
    Elite,
}

impl PlanTier {
    pub const fn label(self) -> &'static str {
        match self {
            PlanTier::Founding => "founding",
            PlanTier::Monthly => "monthly",
            PlanTier::Elite => "elite",
        }
    }

    /// Billing period, or the free trial length for the founding tier.
    pub const fn period_days(self) -> i64 {
        match self {
            PlanTier::Founding => 365,
            PlanTier::Monthly => 30,
            PlanTier::Elite => 365,
        }
    }

    pub const fn is_paid(self) -> bool {
        !matches!(self, PlanTier::Founding)
    }

    /// Accepts the loose labels stored by older clients ("early", "annual", ...).
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim().to_ascii_lowercase();
        if value.contains("founding") || value.contains("early") {
            Some(PlanTier::Founding)
        } else if value.contains("monthly") {
            Some(PlanTier::Monthly)
        } else if value.contains("elite") || value.contains("annual") {
            Some(PlanTier::Elite)
        } else {
            None
        }
    }
}

/// Persisted subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Cancelling,
    Expired,
}

/// Private fields revealed only to the owner and to consumers holding an unlock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub phone: Option<String>,
    pub whatsapp_number: Option<String>,
    pub email: Option<String>,
    pub website_url: Option<String>,
    pub address: Option<String>,
    pub booking_url: Option<String>,
}

/// A service provider's public and private record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
    pub id: ProfessionalId,
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub nationalities: Vec<String>,
    pub image_url: Option<String>,
    /// First entry is the primary profession.
    pub professions: Vec<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub cities: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    pub years_of_experience: Option<u16>,
    #[serde(default)]
    pub bio: String,
    /// Biography keyed by language code.
    #[serde(default)]
    pub bios: BTreeMap<String, String>,
    /// Language code -> original specialty -> translated specialty.
    #[serde(default)]
    pub specialty_translations: BTreeMap<String, BTreeMap<String, String>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub contact: ContactDetails,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub verification_documents: Vec<String>,
    #[serde(default)]
    pub bio_verification_status: BioVerificationStatus,
    pub bio_rejection_reason: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub is_featured: bool,
    pub plan: Option<PlanTier>,
    pub plan_status: Option<PlanStatus>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    /// Set by a successful profile submission.
    #[serde(default)]
    pub is_pro_complete: bool,
    /// Derived; only ever written through `visibility::refresh`.
    #[serde(default)]
    pub is_profile_online: bool,
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub unlock_count: u64,
    /// Query-time distance from the searcher, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl Professional {
    /// Blank record created when an account picks the professional role.
    pub fn new(id: ProfessionalId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            gender: Gender::default(),
            nationalities: Vec::new(),
            image_url: None,
            professions: Vec::new(),
            specialties: Vec::new(),
            cities: Vec::new(),
            languages: Vec::new(),
            years_of_experience: None,
            bio: String::new(),
            bios: BTreeMap::new(),
            specialty_translations: BTreeMap::new(),
            latitude: None,
            longitude: None,
            contact: ContactDetails::default(),
            verification_status: VerificationStatus::None,
            verification_documents: Vec::new(),
            bio_verification_status: BioVerificationStatus::Pending,
            bio_rejection_reason: None,
            verified: false,
            is_featured: false,
            plan: None,
            plan_status: None,
            subscription_ends_at: None,
            is_pro_complete: false,
            is_profile_online: false,
            rating: DEFAULT_RATING,
            review_count: 0,
            unlock_count: 0,
            distance_km: None,
        }
    }

    pub fn primary_profession(&self) -> Option<&str> {
        self.professions.first().map(String::as_str)
    }

    pub fn coordinates(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// Rating shown before any review has been verified.
pub const DEFAULT_RATING: f32 = 5.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Record that a consumer paid to see a professional's private fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockToken {
    pub consumer_id: ConsumerId,
    pub professional_id: ProfessionalId,
    pub unlocked_at: DateTime<Utc>,
}

/// Consumer-side account holding the credit balance and premium entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerAccount {
    pub id: ConsumerId,
    pub email: String,
    pub full_name: Option<String>,
    pub credits: u32,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub is_admin: bool,
}

impl ConsumerAccount {
    pub fn new(id: ConsumerId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            full_name: None,
            credits: 0,
            is_premium: false,
            premium_until: None,
            is_admin: false,
        }
    }

    pub fn has_premium(&self, now: DateTime<Utc>) -> bool {
        self.is_premium && self.premium_until.map_or(true, |until| until > now)
    }
}

/// Moderation state of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Verified,
    Rejected,
}

impl ReviewStatus {
    /// Pending and verified reviews block a new submission for the same pair.
    pub const fn is_active(self) -> bool {
        matches!(self, ReviewStatus::Pending | ReviewStatus::Verified)
    }

    pub const fn label(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Verified => "verified",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

/// A consumer's testimony about a professional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub professional_id: ProfessionalId,
    pub author_id: ConsumerId,
    pub author_name: Option<String>,
    pub stars: u8,
    pub testimony: String,
    pub service_type: String,
    pub is_anonymous: bool,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

/// Review as submitted, before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub professional_id: ProfessionalId,
    pub author_id: ConsumerId,
    pub author_name: Option<String>,
    pub stars: u8,
    pub testimony: String,
    pub service_type: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

impl NewReview {
    /// Stored form, pending moderation.
    pub fn into_review(self, id: ReviewId) -> Review {
        Review {
            id,
            professional_id: self.professional_id,
            author_id: self.author_id,
            author_name: self.author_name,
            stars: self.stars,
            testimony: self.testimony,
            service_type: self.service_type,
            is_anonymous: self.is_anonymous,
            status: ReviewStatus::Pending,
            created_at: self.created_at,
        }
    }
}
