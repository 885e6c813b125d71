use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    ContactDetails, Gender, Professional, ProfessionalId, VerificationStatus,
};
use super::error::MarketplaceError;
use super::geo::coordinates_in_range;
use super::repository::MarketplaceStore;
use super::search::title_case;
use super::service::MarketplaceService;
use super::session::Session;
use super::subscription::CheckoutGateway;
use super::visibility;

/// Partial edit of the owner-controlled profile fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub nationalities: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub professions: Option<Vec<String>>,
    pub specialties: Option<Vec<String>>,
    pub cities: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub years_of_experience: Option<u16>,
    pub bio: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub contact: Option<ContactDetails>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &ProfileUpdate::default()
    }

    /// Coordinates travel as a pair and must be in range.
    fn validate(&self) -> Result<(), MarketplaceError> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) if !coordinates_in_range(latitude, longitude) => {
                Err(MarketplaceError::validation(format!(
                    "coordinates out of range: {latitude}, {longitude}"
                )))
            }
            (Some(_), None) | (None, Some(_)) => Err(MarketplaceError::validation(
                "latitude and longitude must be supplied together",
            )),
            _ => Ok(()),
        }
    }

    fn apply(self, pro: &mut Professional) {
        if let Some(name) = self.name {
            pro.name = name.trim().to_string();
        }
        if let Some(gender) = self.gender {
            pro.gender = gender;
        }
        if let Some(nationalities) = self.nationalities {
            pro.nationalities = clean_tags(nationalities);
        }
        if let Some(image_url) = self.image_url {
            pro.image_url = Some(image_url).filter(|url| !url.trim().is_empty());
        }
        if let Some(professions) = self.professions {
            pro.professions = clean_tags(professions);
        }
        if let Some(specialties) = self.specialties {
            pro.specialties = clean_tags(specialties);
        }
        if let Some(cities) = self.cities {
            pro.cities = clean_tags(cities).iter().map(|city| title_case(city)).collect();
        }
        if let Some(languages) = self.languages {
            pro.languages = clean_tags(languages);
        }
        if let Some(years) = self.years_of_experience {
            pro.years_of_experience = Some(years);
        }
        if let Some(bio) = self.bio {
            pro.bio = bio.trim().to_string();
        }
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            pro.latitude = Some(latitude);
            pro.longitude = Some(longitude);
        }
        if let Some(contact) = self.contact {
            pro.contact = contact;
        }
    }
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|existing| existing == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

/// Per-language content stored alongside a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileTranslations {
    pub bios: BTreeMap<String, String>,
    pub specialties: BTreeMap<String, BTreeMap<String, String>>,
}

impl<S, C> MarketplaceService<S, C>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    /// Owner edit. Every content change sends the profile back to moderation.
    pub fn save_profile(
        &self,
        session: &Session,
        id: &ProfessionalId,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Professional, MarketplaceError> {
        session.require_owner(id)?;
        if update.is_empty() {
            return Err(MarketplaceError::validation("no profile fields supplied"));
        }
        update.validate()?;

        let mut pro = self.load_professional(id)?;
        update.apply(&mut pro);
        visibility::record_edit(&mut pro, now);
        self.store.update_professional(pro.clone())?;

        info!(professional = %id.0, online = pro.is_profile_online, "profile edited");
        Ok(pro)
    }

    pub fn submit_profile(
        &self,
        session: &Session,
        id: &ProfessionalId,
        translations: ProfileTranslations,
        now: DateTime<Utc>,
    ) -> Result<Professional, MarketplaceError> {
        session.require_owner(id)?;
        let mut pro = self.load_professional(id)?;

        visibility::submit(&mut pro, now)?;
        if !translations.bios.is_empty() {
            pro.bios = translations.bios;
        }
        if !translations.specialties.is_empty() {
            pro.specialty_translations = translations.specialties;
        }
        self.store.update_professional(pro.clone())?;

        info!(professional = %id.0, "profile submitted for moderation");
        Ok(pro)
    }

    pub fn approve_profile(
        &self,
        admin: &Session,
        id: &ProfessionalId,
        now: DateTime<Utc>,
    ) -> Result<Professional, MarketplaceError> {
        admin.require_admin()?;
        let mut pro = self.load_professional(id)?;
        visibility::approve(&mut pro, now)?;
        self.store.update_professional(pro.clone())?;

        info!(professional = %id.0, online = pro.is_profile_online, "profile approved");
        Ok(pro)
    }

    pub fn reject_profile(
        &self,
        admin: &Session,
        id: &ProfessionalId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Professional, MarketplaceError> {
        admin.require_admin()?;
        let mut pro = self.load_professional(id)?;
        visibility::reject(&mut pro, reason, now)?;
        self.store.update_professional(pro.clone())?;

        info!(professional = %id.0, reason = reason.trim(), "profile rejected");
        Ok(pro)
    }

    pub fn submit_identity_documents(
        &self,
        session: &Session,
        id: &ProfessionalId,
        document_urls: Vec<String>,
    ) -> Result<Professional, MarketplaceError> {
        session.require_owner(id)?;
        let documents = clean_tags(document_urls);
        if documents.is_empty() {
            return Err(MarketplaceError::validation(
                "at least one identity document is required",
            ));
        }

        let mut pro = self.load_professional(id)?;
        if pro.verification_status == VerificationStatus::Verified {
            return Err(MarketplaceError::Conflict(
                "identity is already verified".to_string(),
            ));
        }
        pro.verification_documents = documents;
        pro.verification_status = VerificationStatus::Pending;
        self.store.update_professional(pro.clone())?;

        info!(professional = %id.0, "identity documents submitted");
        Ok(pro)
    }

    /// Identity outcome only earns or withholds the badge; visibility is untouched.
    pub fn review_identity(
        &self,
        admin: &Session,
        id: &ProfessionalId,
        verified: bool,
    ) -> Result<Professional, MarketplaceError> {
        admin.require_admin()?;
        let mut pro = self.load_professional(id)?;
        if pro.verification_status != VerificationStatus::Pending {
            return Err(MarketplaceError::Conflict(
                "no identity review is pending".to_string(),
            ));
        }

        pro.verification_status = if verified {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Rejected
        };
        pro.verified = verified;
        self.store.update_professional(pro.clone())?;

        info!(professional = %id.0, verified, "identity reviewed");
        Ok(pro)
    }

    pub fn moderation_queue(&self, admin: &Session) -> Result<Vec<Professional>, MarketplaceError> {
        admin.require_admin()?;
        Ok(self.store.pending_moderation()?)
    }

    pub fn identity_queue(&self, admin: &Session) -> Result<Vec<Professional>, MarketplaceError> {
        admin.require_admin()?;
        Ok(self
            .store
            .with_identity_status(VerificationStatus::Pending)?)
    }
}
