//! Generative-AI concierge: conversational matching and profile translation.
//!
//! The model sits behind [`AssistantGateway`]; this module only shapes the context it sees
//! and sanitises what comes back. Failures never surface to the caller: the concierge
//! degrades to a canned answer or an untranslated profile.

pub mod gateway;
pub mod http;
pub mod retry;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::marketplace::{Professional, ProfessionalId, ProfileTranslations};

pub use gateway::{
    AssistAnswer, AssistRequest, AssistantError, AssistantGateway, CandidateSummary, ChatRole,
    ChatTurn, SpecialtyTranslation, Suggestion, TranslationPayload, TranslationRequest,
};
pub use http::HttpAssistantGateway;
pub use retry::RetryingAssistant;

pub const SUPPORTED_LANGUAGES: [&str; 3] = ["en", "fr", "es"];

/// Below this many city matches the context is padded with other professionals.
const CITY_MATCH_MINIMUM: usize = 15;
const PADDED_CONTEXT_SIZE: usize = 20;
const MAX_CONTEXT_SIZE: usize = 25;
const HISTORY_TURNS: usize = 6;
const SUMMARY_SPECIALTIES: usize = 4;
const MIN_TRANSLATABLE_BIO_CHARS: usize = 10;

const DEFAULT_ANSWER: &str = "I found some experts for you.";
const FALLBACK_ANSWER: &str =
    "I'm having a bit of trouble connecting right now. Please try again in a moment.";

/// Maps a locale such as `fr-FR` to the language the model should answer in.
pub fn language_name(code: &str) -> &'static str {
    let primary = code.split('-').next().unwrap_or_default().trim();
    match primary.to_ascii_lowercase().as_str() {
        "fr" => "French",
        "es" => "Spanish",
        _ => "English",
    }
}

/// Concierge answer with recommendations restricted to the supplied candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConciergeReply {
    pub answer: String,
    pub suggestions: Vec<Suggestion>,
    pub recommended_ids: Vec<ProfessionalId>,
    /// True when the gateway failed and the canned answer was returned.
    pub degraded: bool,
}

pub struct ConciergeService<G> {
    gateway: Arc<G>,
}

impl<G: AssistantGateway> ConciergeService<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn ask(
        &self,
        query: &str,
        candidates: &[Professional],
        language: &str,
        history: &[ChatTurn],
        preferred_city: Option<&str>,
    ) -> ConciergeReply {
        let context: Vec<CandidateSummary> = shortlist_candidates(candidates, preferred_city)
            .into_iter()
            .map(summarise)
            .collect();
        let known: HashSet<ProfessionalId> =
            context.iter().map(|summary| summary.id.clone()).collect();

        let skip = history.len().saturating_sub(HISTORY_TURNS);
        let request = AssistRequest {
            query: query.trim().to_string(),
            language: language_name(language).to_string(),
            history: history[skip..].to_vec(),
            candidates: context,
        };
        debug!(
            candidates = request.candidates.len(),
            history = request.history.len(),
            language = %request.language,
            "asking concierge"
        );

        match self.gateway.assist(&request).await {
            Ok(answer) => {
                let offered = answer.recommended_ids.len();
                let recommended_ids: Vec<ProfessionalId> = answer
                    .recommended_ids
                    .into_iter()
                    .filter(|id| known.contains(id))
                    .collect();
                if recommended_ids.len() < offered {
                    debug!(
                        dropped = offered - recommended_ids.len(),
                        "concierge recommended unknown professionals"
                    );
                }
                let answer_text = if answer.answer.trim().is_empty() {
                    DEFAULT_ANSWER.to_string()
                } else {
                    answer.answer
                };
                ConciergeReply {
                    answer: answer_text,
                    suggestions: answer.suggestions,
                    recommended_ids,
                    degraded: false,
                }
            }
            Err(error) => {
                warn!(%error, "concierge unavailable, returning fallback answer");
                ConciergeReply {
                    answer: FALLBACK_ANSWER.to_string(),
                    suggestions: Vec::new(),
                    recommended_ids: Vec::new(),
                    degraded: true,
                }
            }
        }
    }

    /// Bio and specialty translations for every supported language.
    pub async fn translate_profile(
        &self,
        bio: &str,
        specialties: &[String],
    ) -> ProfileTranslations {
        let fallback = untranslated(bio, specialties);
        if bio.chars().count() < MIN_TRANSLATABLE_BIO_CHARS && specialties.is_empty() {
            return fallback;
        }

        let request = TranslationRequest {
            bio: bio.to_string(),
            specialties: specialties.to_vec(),
        };
        match self.gateway.translate(&request).await {
            Ok(payload) => merge_translations(payload, fallback),
            Err(error) => {
                warn!(%error, "translation failed, keeping original text");
                fallback
            }
        }
    }
}

/// Professionals in the preferred city first, padded with others when the city is thin.
pub fn shortlist_candidates<'a>(
    candidates: &'a [Professional],
    preferred_city: Option<&str>,
) -> Vec<&'a Professional> {
    let needle = preferred_city
        .map(|city| city.trim().to_lowercase())
        .filter(|city| !city.is_empty());

    let mut selected: Vec<&Professional> = match &needle {
        Some(city) => candidates
            .iter()
            .filter(|pro| serves_city(pro, city))
            .collect(),
        None => candidates.iter().collect(),
    };

    if selected.len() < CITY_MATCH_MINIMUM {
        let room = PADDED_CONTEXT_SIZE.saturating_sub(selected.len());
        let chosen: HashSet<&ProfessionalId> = selected.iter().map(|pro| &pro.id).collect();
        let others: Vec<&Professional> = candidates
            .iter()
            .filter(|pro| !chosen.contains(&pro.id))
            .take(room)
            .collect();
        selected.extend(others);
    }

    selected.truncate(MAX_CONTEXT_SIZE);
    selected
}

fn serves_city(pro: &Professional, city: &str) -> bool {
    pro.cities
        .iter()
        .any(|name| name.to_lowercase().contains(city))
        || pro
            .contact
            .address
            .as_deref()
            .is_some_and(|address| address.to_lowercase().contains(city))
}

fn summarise(pro: &Professional) -> CandidateSummary {
    CandidateSummary {
        id: pro.id.clone(),
        profession: pro.primary_profession().map(str::to_string),
        specialties: pro
            .specialties
            .iter()
            .take(SUMMARY_SPECIALTIES)
            .cloned()
            .collect(),
        languages: pro.languages.clone(),
        address: pro.contact.address.clone(),
        cities: pro.cities.clone(),
        rating: pro.rating,
        years_of_experience: pro.years_of_experience,
    }
}

fn untranslated(bio: &str, specialties: &[String]) -> ProfileTranslations {
    let identity: BTreeMap<String, String> = specialties
        .iter()
        .map(|specialty| (specialty.clone(), specialty.clone()))
        .collect();

    let mut translations = ProfileTranslations::default();
    for code in SUPPORTED_LANGUAGES {
        translations.bios.insert(code.to_string(), bio.to_string());
        translations
            .specialties
            .insert(code.to_string(), identity.clone());
    }
    translations
}

fn merge_translations(
    payload: TranslationPayload,
    mut fallback: ProfileTranslations,
) -> ProfileTranslations {
    for code in SUPPORTED_LANGUAGES {
        if let Some(bio) = payload.bios.get(code).filter(|text| !text.trim().is_empty()) {
            fallback.bios.insert(code.to_string(), bio.clone());
        }
        let map = fallback.specialties.entry(code.to_string()).or_default();
        for item in &payload.specialty_list {
            let translated = item.for_language(code).unwrap_or(item.original.as_str());
            map.insert(item.original.clone(), translated.to_string());
        }
    }
    fallback
}

#[cfg(test)]
mod tests;
