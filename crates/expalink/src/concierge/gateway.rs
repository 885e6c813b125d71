use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::marketplace::ProfessionalId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One earlier exchange in the concierge conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Compact professional summary handed to the model as matching context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: ProfessionalId,
    pub profession: Option<String>,
    pub specialties: Vec<String>,
    pub languages: Vec<String>,
    pub address: Option<String>,
    pub cities: Vec<String>,
    pub rating: f32,
    pub years_of_experience: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistRequest {
    pub query: String,
    /// Full language name the answer must be written in.
    pub language: String,
    pub history: Vec<ChatTurn>,
    pub candidates: Vec<CandidateSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub profession: String,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistAnswer {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    #[serde(default, rename = "recommendedProIds")]
    pub recommended_ids: Vec<ProfessionalId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationRequest {
    pub bio: String,
    pub specialties: Vec<String>,
}

/// One specialty rendered in every supported language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialtyTranslation {
    pub original: String,
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub fr: String,
    #[serde(default)]
    pub es: String,
}

impl SpecialtyTranslation {
    pub fn for_language(&self, code: &str) -> Option<&str> {
        let value = match code {
            "en" => &self.en,
            "fr" => &self.fr,
            "es" => &self.es,
            _ => return None,
        };
        Some(value.as_str()).filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationPayload {
    #[serde(default)]
    pub bios: BTreeMap<String, String>,
    #[serde(default)]
    pub specialty_list: Vec<SpecialtyTranslation>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant rate limited the request")]
    RateLimited,
    #[error("assistant unavailable: {0}")]
    Unavailable(String),
    #[error("assistant rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("assistant transport failure: {0}")]
    Transport(String),
    #[error("assistant returned malformed content: {0}")]
    MalformedResponse(String),
}

impl AssistantError {
    /// Only throttling and temporary outages are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssistantError::RateLimited | AssistantError::Unavailable(_))
    }
}

/// Opaque generative-AI collaborator.
#[async_trait]
pub trait AssistantGateway: Debug + Send + Sync {
    async fn assist(&self, request: &AssistRequest) -> Result<AssistAnswer, AssistantError>;
    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationPayload, AssistantError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_reads_the_camel_case_wire_format() {
        let raw = r#"{
            "answer": "A specialist nearby speaks French.",
            "suggestions": [{ "profession": "Pediatrician" }],
            "recommendedProIds": ["pro-3"]
        }"#;
        let answer: AssistAnswer = serde_json::from_str(raw).expect("parses");
        assert_eq!(answer.recommended_ids, vec![ProfessionalId("pro-3".to_string())]);
        assert_eq!(answer.suggestions[0].city, None);
    }

    #[test]
    fn blank_specialty_translation_is_absent() {
        let item = SpecialtyTranslation {
            original: "Boilers".to_string(),
            en: "Boilers".to_string(),
            fr: " ".to_string(),
            es: "Calderas".to_string(),
        };
        assert_eq!(item.for_language("es"), Some("Calderas"));
        assert_eq!(item.for_language("fr"), None);
        assert_eq!(item.for_language("de"), None);
    }

    #[test]
    fn only_throttling_and_outages_retry() {
        assert!(AssistantError::RateLimited.is_retryable());
        assert!(AssistantError::Unavailable("503".to_string()).is_retryable());
        assert!(!AssistantError::Transport("dns".to_string()).is_retryable());
        assert!(!AssistantError::Rejected {
            status: 400,
            body: String::new()
        }
        .is_retryable());
    }
}
