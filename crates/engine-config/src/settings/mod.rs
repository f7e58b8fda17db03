use crate::settings::templates::TemplateLibrary;
use model::jobs::request::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod env;
pub mod error;
pub mod loader;
pub mod templates;
pub mod validated;
pub mod validator;

pub use error::SettingsError;
pub use validated::ValidatedSettings;

pub const DEFAULT_RATE_LIMIT: u32 = 20;
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const MAX_WORKER_COUNT: usize = 8;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a data manipulation assistant. Transform the cell content according to the user's instructions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    #[default]
    OpenAi,
    Ollama,
}

impl ApiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiType::OpenAi => "openai",
            ApiType::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-editable processing settings as stored in `settings.json`.
///
/// Every field has a default, so a partial file (or none at all) is valid.
/// Unknown keys are ignored. Values are only checked by [`validator`], which
/// turns them into [`ValidatedSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
    /// Provider calls admitted per rolling minute
    pub rate_limit: u32,
    /// Completed jobs between checkpoints
    pub batch_size: usize,
    pub max_retries: u32,
    pub worker_count: usize,
    /// When off, the pool is forced down to a single worker
    pub multi_threading: bool,
    pub auto_save: bool,
    pub temperature: f32,
    pub max_tokens: u32,

    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// How long in-flight calls may finish after cancellation
    pub cancel_grace_ms: u64,
    pub request_timeout_secs: u64,
    pub log_level: String,

    pub api_type: ApiType,
    pub model: String,
    /// Never written back to disk; supply it through `OPENAI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub ollama_url: String,
    pub ollama_model: String,

    pub default_system_prompt: String,
    pub templates: TemplateLibrary,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        ProcessingSettings {
            rate_limit: DEFAULT_RATE_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            worker_count: DEFAULT_WORKER_COUNT,
            multi_threading: true,
            auto_save: true,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
            cancel_grace_ms: 2_000,
            request_timeout_secs: 60,
            log_level: "info".to_string(),
            api_type: ApiType::OpenAi,
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3".to_string(),
            default_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            templates: TemplateLibrary::default(),
        }
    }
}

impl ProcessingSettings {
    /// Model name for the selected backend.
    pub fn active_model(&self) -> &str {
        match self.api_type {
            ApiType::OpenAi => &self.model,
            ApiType::Ollama => &self.ollama_model,
        }
    }
}
