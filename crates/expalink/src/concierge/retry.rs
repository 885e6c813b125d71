use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::gateway::{
    AssistAnswer, AssistRequest, AssistantError, AssistantGateway, TranslationPayload,
    TranslationRequest,
};
use crate::config::AssistantConfig;

/// Gateway decorator retrying throttled or unavailable calls with exponential backoff.
#[derive(Debug)]
pub struct RetryingAssistant<G> {
    inner: G,
    max_attempts: u32,
    initial_backoff: Duration,
}

impl<G: AssistantGateway> RetryingAssistant<G> {
    pub fn new(inner: G, max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    pub fn from_config(inner: G, config: &AssistantConfig) -> Self {
        Self::new(inner, config.max_attempts, config.initial_backoff)
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    async fn call<T, F, Fut>(
        &self,
        operation: &'static str,
        attempt_once: F,
    ) -> Result<T, AssistantError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AssistantError>>,
    {
        let mut attempt = 0;
        loop {
            match attempt_once().await {
                Err(error) if error.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.initial_backoff.saturating_mul(2u32.saturating_pow(attempt));
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "assistant call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

#[async_trait]
impl<G: AssistantGateway> AssistantGateway for RetryingAssistant<G> {
    async fn assist(&self, request: &AssistRequest) -> Result<AssistAnswer, AssistantError> {
        self.call("assist", || self.inner.assist(request)).await
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationPayload, AssistantError> {
        self.call("translate", || self.inner.translate(request)).await
    }
}
