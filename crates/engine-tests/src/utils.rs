#![allow(dead_code)]

use async_trait::async_trait;
use engine_config::settings::{ProcessingSettings, validator::SettingsValidator};
use engine_core::{
    connectors::provider::{CompletionParams, CompletionProvider, ProviderError},
    progress::NoopReporter,
    rate_limit::RateLimiter,
    retry::RetryPolicy,
};
use engine_processing::scheduler::{BatchScheduler, SchedulerConfig};
use engine_runtime::executor::Executor;
use model::{
    jobs::{BatchRequest, PromptTemplate, RowRange},
    records::table::Table,
};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

pub const RAW_PHONES: [&str; 5] = [
    "555-123-4567",
    "(555) 987-6543",
    "5551230987",
    "555.111.2222",
    "555 444 3333",
];

pub const NORMALIZED_PHONES: [&str; 5] = [
    "(555) 123-4567",
    "(555) 987-6543",
    "(555) 123-0987",
    "(555) 111-2222",
    "(555) 444-3333",
];

pub const PHONE_CSV: &str = "name,phone\n\
Ada,555-123-4567\n\
Grace,(555) 987-6543\n\
Alan,5551230987\n\
Edsger,555.111.2222\n\
Barbara,555 444 3333\n";

pub fn phone_table() -> Table {
    let names = ["Ada", "Grace", "Alan", "Edsger", "Barbara"];
    Table::from_rows(
        vec!["name".into(), "phone".into()],
        names
            .iter()
            .zip(RAW_PHONES)
            .map(|(name, phone)| vec![name.to_string(), phone.to_string()])
            .collect(),
    )
    .expect("phone table")
}

pub fn phone_request() -> BatchRequest {
    BatchRequest::new(
        RowRange::new(0, 4),
        vec!["phone".into()],
        PromptTemplate::new("You format data.", "Format this as a standard phone number."),
    )
    .with_batch_size(2)
    .with_max_retries(1)
}

/// Ten digits rendered as `(XXX) XXX-XXXX`; anything else comes back as is.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 10 {
        return raw.to_string();
    }
    format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..])
}

/// The cell value embedded in a rendered prompt without a `{cell}` placeholder.
pub fn cell_from_prompt(prompt: &str) -> &str {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("Cell content: "))
        .unwrap_or_default()
}

type Script = dyn Fn(usize, &str) -> Result<String, ProviderError> + Send + Sync;

/// Provider that answers from a closure of (call index, user prompt) and
/// remembers every prompt it saw.
pub struct ScriptedProvider {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    script: Box<Script>,
}

impl ScriptedProvider {
    pub fn new(
        script: impl Fn(usize, &str) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            script: Box::new(script),
        })
    }

    /// Normalises the phone number found in each prompt.
    pub fn phone_formatter() -> Arc<Self> {
        Self::new(|_, prompt| Ok(normalize_phone(cell_from_prompt(prompt))))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _params: &CompletionParams,
    ) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(user_prompt.to_string());
        (self.script)(call, user_prompt)
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(100))
}

pub fn scheduler(workers: usize, rate_per_minute: u32) -> BatchScheduler {
    let config = SchedulerConfig::default()
        .with_workers(workers)
        .with_retry(fast_retry())
        .with_cancel_grace(Duration::from_millis(200));
    BatchScheduler::new(config, Arc::new(RateLimiter::per_minute(rate_per_minute)))
        .with_reporter(Arc::new(NoopReporter))
}

pub fn settings() -> ProcessingSettings {
    ProcessingSettings {
        rate_limit: 600,
        batch_size: 2,
        max_retries: 1,
        worker_count: 2,
        retry_base_delay_ms: 5,
        retry_max_delay_ms: 20,
        ..Default::default()
    }
}

pub fn executor(settings: ProcessingSettings) -> Executor {
    let validated = SettingsValidator::new(&settings)
        .validate()
        .expect("valid settings");
    Executor::new(settings, validated)
}
