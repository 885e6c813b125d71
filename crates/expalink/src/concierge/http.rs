use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::gateway::{
    AssistAnswer, AssistRequest, AssistantError, AssistantGateway, CandidateSummary, ChatTurn,
    TranslationPayload, TranslationRequest,
};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the edge function fronting the generative model.
pub struct HttpAssistantGateway {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpAssistantGateway {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|error| AssistantError::Transport(error.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<T: DeserializeOwned>(
        &self,
        body: &EdgeRequest<'_>,
    ) -> Result<T, AssistantError> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                AssistantError::Unavailable(format!(
                    "request timed out after {REQUEST_TIMEOUT_SECS}s"
                ))
            } else {
                AssistantError::Transport(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        response
            .json()
            .await
            .map_err(|error| AssistantError::MalformedResponse(error.to_string()))
    }
}

impl std::fmt::Debug for HttpAssistantGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAssistantGateway")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

fn classify_status(status: StatusCode, body: String) -> AssistantError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => AssistantError::RateLimited,
        StatusCode::SERVICE_UNAVAILABLE => AssistantError::Unavailable(body),
        other => AssistantError::Rejected {
            status: other.as_u16(),
            body,
        },
    }
}

/// Body shared by both edge tasks.
#[derive(Debug, Serialize)]
struct EdgeRequest<'a> {
    task: &'static str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<&'a [ChatTurn]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a [CandidateSummary]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    specialties: Option<&'a [String]>,
}

impl<'a> EdgeRequest<'a> {
    fn assistance(request: &'a AssistRequest) -> Self {
        Self {
            task: "assistance",
            text: &request.query,
            language: Some(request.language.as_str()),
            history: Some(request.history.as_slice()),
            context: Some(request.candidates.as_slice()),
            specialties: None,
        }
    }

    fn translation(request: &'a TranslationRequest) -> Self {
        Self {
            task: "translation",
            text: &request.bio,
            language: None,
            history: None,
            context: None,
            specialties: Some(request.specialties.as_slice()),
        }
    }
}

#[async_trait]
impl AssistantGateway for HttpAssistantGateway {
    async fn assist(&self, request: &AssistRequest) -> Result<AssistAnswer, AssistantError> {
        self.post(&EdgeRequest::assistance(request)).await
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationPayload, AssistantError> {
        self.post(&EdgeRequest::translation(request)).await
    }
}
