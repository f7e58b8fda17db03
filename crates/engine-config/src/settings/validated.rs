use crate::settings::ApiType;
use engine_core::retry::RetryPolicy;
use std::time::Duration;

/// Checked settings handed to the scheduler and runtime.
#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    pub rate_limit: u32,
    pub batch_size: usize,
    pub max_retries: u32,
    pub worker_count: usize,
    pub auto_save: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub cancel_grace: Duration,
    pub request_timeout: Duration,
    pub api_type: ApiType,
}

impl ValidatedSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base_delay, self.retry_max_delay)
    }
}
