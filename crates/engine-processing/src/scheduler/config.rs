use engine_config::settings::ValidatedSettings;
use engine_core::retry::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_millis(2_000);

/// Scheduler behaviour that is fixed for the scheduler's lifetime.
/// Per-run knobs (retries, batch size, sampling) come from the request.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Upper bound on concurrent provider calls
    pub worker_count: usize,

    /// Backoff shape; `max_retries` is replaced by the request's value
    pub retry: RetryPolicy,

    /// How long in-flight calls may finish once cancellation is observed
    pub cancel_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            retry: RetryPolicy::default(),
            cancel_grace: DEFAULT_CANCEL_GRACE,
        }
    }
}

impl SchedulerConfig {
    pub fn from_settings(settings: &ValidatedSettings) -> Self {
        Self {
            worker_count: settings.worker_count,
            retry: settings.retry_policy(),
            cancel_grace: settings.cancel_grace,
        }
    }

    pub fn with_workers(mut self, count: usize) -> Self {
        self.worker_count = count.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }
}
