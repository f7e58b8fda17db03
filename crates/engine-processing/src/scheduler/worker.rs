use crate::retry::classify_provider_error;
use engine_core::{
    connectors::provider::{CompletionParams, CompletionProvider, ProviderError},
    rate_limit::RateLimiter,
    retry::{RetryDisposition, RetryPolicy},
};
use model::jobs::CellJob;
use std::{collections::VecDeque, sync::Arc, time::Duration};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The part of a job a worker needs to call the provider.
#[derive(Debug, Clone)]
pub(crate) struct WorkItem {
    pub position: usize,
    pub row: usize,
    pub column: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl From<&CellJob> for WorkItem {
    fn from(job: &CellJob) -> Self {
        WorkItem {
            position: job.position,
            row: job.row_index,
            column: job.column_name.clone(),
            system_prompt: job.system_prompt.clone(),
            user_prompt: job.user_prompt.clone(),
        }
    }
}

pub(crate) type WorkQueue = Arc<Mutex<VecDeque<WorkItem>>>;

/// Messages from workers to the coordinator. Per worker they arrive in the
/// order they were sent: `Dispatched` always precedes the job's outcome.
#[derive(Debug)]
pub(crate) enum WorkerReport {
    Dispatched {
        worker: usize,
        position: usize,
    },
    RetryScheduled {
        position: usize,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    Finished {
        position: usize,
        attempts: u32,
        result: Result<String, String>,
    },
    /// Cancellation was observed before the job reached a result.
    Abandoned {
        position: usize,
        attempts: u32,
    },
}

#[derive(Clone)]
pub(crate) struct Worker {
    pub id: usize,
    pub queue: WorkQueue,
    pub limiter: Arc<RateLimiter>,
    pub provider: Arc<dyn CompletionProvider>,
    pub params: CompletionParams,
    pub retry: RetryPolicy,
    pub reports: mpsc::Sender<WorkerReport>,
    pub cancel: CancellationToken,
}

impl Worker {
    pub async fn run(self) {
        let mut handled = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let Some(item) = self.queue.lock().await.pop_front() else {
                break;
            };

            let dispatched = WorkerReport::Dispatched {
                worker: self.id,
                position: item.position,
            };
            if self.reports.send(dispatched).await.is_err() {
                break;
            }

            let report = self.process(&item).await;
            if self.reports.send(report).await.is_err() {
                break;
            }
            handled += 1;
        }

        debug!(worker = self.id, jobs = handled, "Worker stopped");
    }

    async fn process(&self, item: &WorkItem) -> WorkerReport {
        let mut attempts = 0u32;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return WorkerReport::Abandoned { position: item.position, attempts };
                }
                _ = self.limiter.acquire() => {}
            }

            attempts += 1;
            let err = match self
                .provider
                .complete(&item.system_prompt, &item.user_prompt, &self.params)
                .await
            {
                Ok(text) => {
                    return WorkerReport::Finished {
                        position: item.position,
                        attempts,
                        result: Ok(text),
                    };
                }
                Err(err) => err,
            };

            let retryable = classify_provider_error(&err) == RetryDisposition::Retry;
            if !retryable || !self.retry.allows_retry(attempts) {
                warn!(
                    row = item.row,
                    column = %item.column,
                    attempts,
                    error = %err,
                    "Cell failed"
                );
                return WorkerReport::Finished {
                    position: item.position,
                    attempts,
                    result: Err(err.to_string()),
                };
            }

            if self.cancel.is_cancelled() {
                return WorkerReport::Abandoned {
                    position: item.position,
                    attempts,
                };
            }

            let delay = self.retry_delay(attempts, &err);
            debug!(
                row = item.row,
                column = %item.column,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying cell"
            );
            let _ = self
                .reports
                .send(WorkerReport::RetryScheduled {
                    position: item.position,
                    attempt: attempts,
                    delay,
                    error: err.to_string(),
                })
                .await;

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return WorkerReport::Abandoned { position: item.position, attempts };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Backoff for the next attempt, stretched to a server `Retry-After`
    /// hint when that is longer, within the policy cap.
    fn retry_delay(&self, attempts: u32, err: &ProviderError) -> Duration {
        let backoff = self.retry.backoff_delay(attempts);
        match err.retry_after {
            Some(hint) if hint > backoff => hint.min(self.retry.max_delay),
            _ => backoff,
        }
    }
}
