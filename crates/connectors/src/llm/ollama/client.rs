use super::types::{
    ErrorResponse, GenerateOptions, GenerateRequest, GenerateResponse, ListModelsResponse,
};
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
use tracing::{debug, info};

const PROVIDER: &str = "ollama";
pub const DEFAULT_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3";

#[derive(Debug)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, ConnectorError> {
        Ok(OllamaProvider {
            client: http_client(DEFAULT_REQUEST_TIMEOUT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConnectorError> {
        self.client = http_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Names of the models the local server has pulled.
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| from_reqwest(PROVIDER, e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &text));
        }

        let parsed: ListModelsResponse = response
            .json()
            .await
            .map_err(|e| from_reqwest(PROVIDER, e, self.timeout))?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    /// Lists models, then asks for a one-word generation.
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        let models = self.list_models().await?;
        info!(url = %self.base_url, models = models.len(), "Ollama server reachable");

        let params = CompletionParams {
            temperature: 0.1,
            max_tokens: 10,
        };
        self.complete("", "Say hello in one word:", &params).await?;
        Ok(())
    }
}

fn error_for_status(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string());

    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderErrorKind::Unauthorized,
        other => ProviderErrorKind::Status(other.as_u16()),
    };
    ProviderError::new(PROVIDER, kind, message)
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: user_prompt,
            system: system_prompt,
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
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
            return Err(error_for_status(status, &text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| from_reqwest(PROVIDER, e, self.timeout))?;

        let text = parsed.response.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::empty(PROVIDER));
        }

        debug!(model = %self.model, done = parsed.done, chars = text.len(), "Completion received");
        Ok(text)
    }
}
