use crate::error::CliError;
use async_trait::async_trait;
use connectors::llm::OllamaProvider;
use engine_config::settings::{ApiType, ProcessingSettings, ValidatedSettings};
use engine_core::connectors::provider::{CompletionParams, CompletionProvider};
use engine_runtime::factory::create_provider;
use std::sync::Arc;
use tracing::{error, info};

/// Trait for "pinging" a completion backend
#[async_trait]
pub trait ConnectionPinger: Send + Sync {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

/// Lists the local server's models before asking for a short answer
pub struct OllamaPinger {
    pub provider: OllamaProvider,
}

/// Any backend, through a single short completion
pub struct CompletionPinger {
    pub provider: Arc<dyn CompletionProvider>,
}

#[async_trait]
impl ConnectionPinger for OllamaPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!(model = self.provider.model(), "Pinging Ollama");
        self.provider.test_connection().await.map_err(|e| {
            error!(error = %e, "Ollama connection test failed");
            CliError::Provider(e)
        })
    }
}

#[async_trait]
impl ConnectionPinger for CompletionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!(provider = self.provider.name(), "Pinging completion backend");
        let params = CompletionParams {
            temperature: 0.1,
            max_tokens: 10,
        };

        let reply = self
            .provider
            .complete("", "Say hello in one word:", &params)
            .await
            .map_err(|e| {
                error!(provider = self.provider.name(), error = %e, "Ping failed");
                CliError::Provider(e)
            })?;
        info!(provider = self.provider.name(), reply = %reply, "Backend answered");
        Ok(())
    }
}

pub fn pinger_for(
    settings: &ProcessingSettings,
    validated: &ValidatedSettings,
) -> Result<Box<dyn ConnectionPinger>, CliError> {
    match settings.api_type {
        ApiType::Ollama => {
            let provider = OllamaProvider::new(&settings.ollama_url, &settings.ollama_model)?
                .with_timeout(validated.request_timeout)?;
            Ok(Box::new(OllamaPinger { provider }))
        }
        ApiType::OpenAi => Ok(Box::new(CompletionPinger {
            provider: create_provider(settings, validated)?,
        })),
    }
}
