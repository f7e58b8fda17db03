use super::types::{ApiError, ChatRequest, ChatResponse, Message};
use crate::{
    error::ConnectorError,
    llm::{DEFAULT_REQUEST_TIMEOUT, from_reqwest, http_client, parse_retry_after},
};
use async_trait::async_trait;
use engine_core::connectors::provider::{
    CompletionParams, CompletionProvider, ProviderError, ProviderErrorKind,
};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "openai";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ConnectorError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConnectorError::MissingProperty("OPENAI_API_KEY".into()));
        }

        Ok(OpenAiProvider {
            client: http_client(DEFAULT_REQUEST_TIMEOUT)?,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConnectorError> {
        self.client = http_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn error_for_status(&self, status: StatusCode, body: &str) -> ProviderError {
        let (message, code) = match serde_json::from_str::<ApiError>(body) {
            Ok(api) => (api.error.message, api.error.code),
            Err(_) => (body.to_string(), None),
        };

        let kind = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderErrorKind::Unauthorized,
            _ if code.as_deref() == Some("content_policy_violation") => {
                ProviderErrorKind::ContentPolicy
            }
            other => ProviderErrorKind::Status(other.as_u16()),
        };
        ProviderError::new(PROVIDER, kind, message)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| from_reqwest(PROVIDER, e, self.timeout))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::rate_limited(
                PROVIDER,
                parse_retry_after(response.headers()),
            ));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.error_for_status(status, &text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| from_reqwest(PROVIDER, e, self.timeout))?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ProviderError::new(
                PROVIDER,
                ProviderErrorKind::MalformedResponse,
                "response has no choices",
            )
        })?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(ProviderError::new(
                PROVIDER,
                ProviderErrorKind::ContentPolicy,
                "completion withheld by content filter",
            ));
        }

        let text = choice.message.content.unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::empty(PROVIDER));
        }

        debug!(model = %self.model, chars = text.len(), "Completion received");
        Ok(text)
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
