use crate::executor::Executor;
use async_trait::async_trait;
use engine_config::settings::{ProcessingSettings, validator::SettingsValidator};
use engine_core::{
    connectors::provider::{CompletionParams, CompletionProvider, ProviderError},
    progress::NoopReporter,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

mod workflow;

/// Echoes the cell back upper-cased, prefixed by the system prompt's first word.
pub(crate) struct EchoProvider {
    calls: AtomicUsize,
}

impl EchoProvider {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _params: &CompletionParams,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let cell = user_prompt
            .lines()
            .find_map(|l| l.strip_prefix("Cell content: "))
            .unwrap_or_default();
        Ok(cell.to_uppercase())
    }
}

pub(crate) fn settings() -> ProcessingSettings {
    ProcessingSettings {
        rate_limit: 600,
        batch_size: 2,
        max_retries: 1,
        worker_count: 2,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 2,
        auto_save: true,
        ..Default::default()
    }
}

pub(crate) fn executor(settings: ProcessingSettings) -> Executor {
    let validated = SettingsValidator::new(&settings).validate().unwrap();
    Executor::new(settings, validated).with_reporter(Arc::new(NoopReporter))
}
