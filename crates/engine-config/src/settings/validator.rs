use crate::settings::{
    MAX_WORKER_COUNT, ProcessingSettings, error::SettingsError, validated::ValidatedSettings,
};
use std::time::Duration;
use tracing::{info, warn};

/// Checks every field and reports all problems at once.
pub struct SettingsValidator<'a> {
    settings: &'a ProcessingSettings,
}

impl<'a> SettingsValidator<'a> {
    pub fn new(settings: &'a ProcessingSettings) -> Self {
        Self { settings }
    }

    pub fn validate(&self) -> Result<ValidatedSettings, SettingsError> {
        let s = self.settings;
        let mut errors: Vec<String> = Vec::new();

        if s.rate_limit == 0 {
            errors.push("rate_limit must be at least 1".to_string());
        }

        if s.batch_size == 0 {
            errors.push("batch_size must be at least 1".to_string());
        } else if s.batch_size > 1_000 {
            warn!(
                batch_size = s.batch_size,
                "Batch size is very large, checkpoints will be rare"
            );
        }

        if !(1..=MAX_WORKER_COUNT).contains(&s.worker_count) {
            errors.push(format!(
                "worker_count must be between 1 and {MAX_WORKER_COUNT}, got {}",
                s.worker_count
            ));
        }

        if !(0.0..=2.0).contains(&s.temperature) {
            errors.push(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                s.temperature
            ));
        }

        if s.max_tokens == 0 {
            errors.push("max_tokens must be at least 1".to_string());
        }

        if s.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be at least 1".to_string());
        }

        if s.retry_max_delay_ms < s.retry_base_delay_ms {
            errors.push(format!(
                "retry_max_delay_ms ({}) is below retry_base_delay_ms ({})",
                s.retry_max_delay_ms, s.retry_base_delay_ms
            ));
        }

        if !errors.is_empty() {
            return Err(SettingsError::ValidationFailed(errors));
        }

        let validated = ValidatedSettings {
            rate_limit: s.rate_limit,
            batch_size: s.batch_size,
            max_retries: s.max_retries,
            worker_count: if s.multi_threading { s.worker_count } else { 1 },
            auto_save: s.auto_save,
            temperature: s.temperature,
            max_tokens: s.max_tokens,
            retry_base_delay: Duration::from_millis(s.retry_base_delay_ms),
            retry_max_delay: Duration::from_millis(s.retry_max_delay_ms),
            cancel_grace: Duration::from_millis(s.cancel_grace_ms),
            request_timeout: Duration::from_secs(s.request_timeout_secs),
            api_type: s.api_type,
        };

        info!(
            rate_limit = validated.rate_limit,
            batch_size = validated.batch_size,
            max_retries = validated.max_retries,
            workers = validated.worker_count,
            auto_save = validated.auto_save,
            backend = %validated.api_type,
            "Settings validated"
        );
        Ok(validated)
    }
}
