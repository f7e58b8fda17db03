use crate::{
    error::SetupError,
    jobs::build_jobs,
    scheduler::{
        coordinator::RunState,
        pool::{WorkerExit, WorkerPool},
        worker::{WorkItem, Worker, WorkerReport},
    },
    sink::ResultSink,
};
use chrono::Utc;
use engine_core::{
    connectors::provider::{CompletionParams, CompletionProvider},
    metrics::Metrics,
    progress::{ProgressReporter, TracingReporter},
    rate_limit::RateLimiter,
};
use model::{
    core::identifiers::RunId,
    events::BatchEvent,
    jobs::{BatchOutcome, BatchRequest},
};
use std::{collections::VecDeque, sync::Arc};
use tokio::{
    sync::{Mutex, mpsc},
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub mod config;
mod coordinator;
mod pool;
mod worker;

pub use config::SchedulerConfig;

const REPORT_CHANNEL_CAPACITY: usize = 64;

/// Runs a [`BatchRequest`] against a table through a bounded worker pool.
///
/// Workers pull jobs from a shared queue in dispatch order, take a rate
/// limiter slot per attempt and call the provider. A single coordinator
/// (the task calling [`run`](Self::run)) receives their reports, applies
/// status transitions, commits to the sink and checkpoints every
/// `batch_size` completed jobs.
pub struct BatchScheduler {
    config: SchedulerConfig,
    limiter: Arc<RateLimiter>,
    reporter: Arc<dyn ProgressReporter>,
    metrics: Metrics,
}

impl BatchScheduler {
    pub fn new(config: SchedulerConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            config,
            limiter,
            reporter: Arc::new(TracingReporter),
            metrics: Metrics::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn run(
        &self,
        request: &BatchRequest,
        sink: &mut ResultSink,
        provider: Arc<dyn CompletionProvider>,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome, SetupError> {
        let run_id = RunId::generate();
        let started = std::time::Instant::now();

        let jobs = match build_jobs(request, sink.table()) {
            Ok(jobs) => jobs,
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Batch setup failed");
                self.reporter.report(&BatchEvent::Failed {
                    run_id: run_id.to_string(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e);
            }
        };

        let total = jobs.len();
        let workers = self.config.worker_count.clamp(1, total.max(1));
        info!(
            run_id = %run_id,
            cells = total,
            workers,
            provider = provider.name(),
            batch_size = request.batch_size,
            max_retries = request.max_retries,
            "Starting batch"
        );
        self.reporter.report(&BatchEvent::Started {
            run_id: run_id.to_string(),
            total_jobs: total,
            workers,
            timestamp: Utc::now(),
        });

        let queue: VecDeque<WorkItem> = jobs.iter().map(WorkItem::from).collect();
        let queue = Arc::new(Mutex::new(queue));
        let (tx, mut rx) = mpsc::channel(REPORT_CHANNEL_CAPACITY);
        let params = CompletionParams {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let retry = self.config.retry.clone().with_max_retries(request.max_retries);
        let mut pool = WorkerPool::new(Worker {
            id: 0,
            queue,
            limiter: self.limiter.clone(),
            provider: provider.clone(),
            params,
            retry,
            reports: tx,
            cancel: cancel.clone(),
        });
        for _ in 0..workers {
            pool.spawn();
        }

        let mut state = RunState::new(
            run_id,
            jobs,
            request.batch_size,
            request.auto_save,
            self.reporter.clone(),
            self.metrics.clone(),
        );

        self.coordinate(&mut state, &mut rx, &mut pool, sink, &cancel)
            .await;

        pool.abort_all();
        let mut late_panics = Vec::new();
        while let Some(exit) = pool.join_next().await {
            if let WorkerExit::Panicked { worker, message } = exit {
                late_panics.push((worker, message));
            }
        }

        // Reports sent just before the pool was torn down still count.
        while let Ok(report) = rx.try_recv() {
            state.handle(report, sink);
        }
        for (worker, message) in late_panics {
            state.worker_panicked(worker, &message, sink);
        }

        Ok(state.finish(sink, started, cancel.is_cancelled()))
    }

    /// Drains worker reports until every worker is done or the grace period
    /// after cancellation runs out. A panicked worker fails the cell it held
    /// and is replaced while the run is live.
    async fn coordinate(
        &self,
        state: &mut RunState,
        rx: &mut mpsc::Receiver<WorkerReport>,
        pool: &mut WorkerPool,
        sink: &mut ResultSink,
        cancel: &CancellationToken,
    ) {
        let mut grace_deadline: Option<Instant> = None;

        loop {
            let deadline = grace_deadline;
            tokio::select! {
                biased;
                Some(report) = rx.recv() => state.handle(report, sink),
                exit = pool.join_next(), if !pool.is_empty() => {
                    if let Some(WorkerExit::Panicked { worker, message }) = exit {
                        state.worker_panicked(worker, &message, sink);
                        if !cancel.is_cancelled() {
                            pool.spawn();
                        }
                    }
                    if pool.is_empty() {
                        break;
                    }
                }
                _ = cancel.cancelled(), if grace_deadline.is_none() => {
                    warn!(
                        run_id = %state.run_id,
                        completed = state.completed(),
                        in_flight = state.in_flight(),
                        grace_ms = self.config.cancel_grace.as_millis() as u64,
                        "Cancellation requested, waiting for in-flight cells"
                    );
                    state.report_cancel();
                    grace_deadline = Some(Instant::now() + self.config.cancel_grace);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    warn!(
                        run_id = %state.run_id,
                        stragglers = state.in_flight(),
                        "Grace period elapsed, abandoning in-flight cells"
                    );
                    break;
                }
                else => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use engine_core::{
        connectors::provider::{ProviderError, ProviderErrorKind},
        progress::ChannelReporter,
        retry::RetryPolicy,
    };
    use model::{
        events::Event,
        jobs::{BatchState, JobStatus, PromptTemplate, RowRange},
        records::table::Table,
    };
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    type Script = dyn Fn(usize, &str) -> Result<String, ProviderError> + Send + Sync;

    /// Answers from a closure of (call index, user prompt).
    struct ScriptedProvider {
        calls: AtomicUsize,
        script: Box<Script>,
    }

    impl ScriptedProvider {
        fn new(
            script: impl Fn(usize, &str) -> Result<String, ProviderError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Box::new(script),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
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
            (self.script)(call, user_prompt)
        }
    }

    /// Never answers.
    struct HangingProvider;

    #[async_trait]
    impl CompletionProvider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _params: &CompletionParams,
        ) -> Result<String, ProviderError> {
            std::future::pending().await
        }
    }

    fn table(rows: usize) -> Table {
        Table::from_rows(
            vec!["text".into()],
            (0..rows).map(|i| vec![format!("item {i}")]).collect(),
        )
        .unwrap()
    }

    fn request(rows: usize) -> BatchRequest {
        BatchRequest::new(
            RowRange::new(0, rows - 1),
            vec!["text".into()],
            PromptTemplate::new("sys", "Uppercase."),
        )
        .with_auto_save(false)
    }

    fn scheduler(workers: usize) -> BatchScheduler {
        let config = SchedulerConfig::default()
            .with_workers(workers)
            .with_retry(RetryPolicy::immediate(3))
            .with_cancel_grace(Duration::from_millis(500));
        BatchScheduler::new(config, Arc::new(RateLimiter::per_minute(1_000)))
    }

    fn cell_of(prompt: &str) -> String {
        prompt.rsplit("Cell content: ").next().unwrap_or_default().to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn all_cells_succeed_without_retries() {
        let provider = ScriptedProvider::new(|_, prompt| Ok(cell_of(prompt).to_uppercase()));
        let mut sink = ResultSink::in_memory(table(6));

        let outcome = scheduler(3)
            .run(
                &request(6).with_max_retries(0),
                &mut sink,
                provider.clone(),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.state, BatchState::Completed);
        assert_eq!(
            (
                outcome.succeeded_count(),
                outcome.failed_count(),
                outcome.skipped_count()
            ),
            (6, 0, 0)
        );
        assert!(!outcome.cancelled);
        assert_eq!(provider.calls(), 6);
        assert_eq!(sink.table().cell(4, "text"), Some("ITEM 4"));
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_failure_exhausts_budget() {
        let provider = ScriptedProvider::new(|_, _| {
            Err(ProviderError::status("scripted", 503, "overloaded"))
        });
        let mut sink = ResultSink::in_memory(table(1));
        let scheduler = scheduler(1);

        let outcome = scheduler
            .run(
                &request(1).with_max_retries(2),
                &mut sink,
                provider.clone(),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let job = &outcome.jobs[0];
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.attempt_count, 3);
        assert!(job.error.as_deref().unwrap_or_default().contains("overloaded"));
        assert_eq!(provider.calls(), 3);
        assert_eq!(scheduler.metrics().snapshot().retry_count, 2);
        assert_eq!(sink.table().cell(0, "text"), Some("item 0"));
    }

    #[tokio::test(start_paused = true)]
    async fn logical_failure_is_not_retried() {
        let provider = ScriptedProvider::new(|_, _| {
            Err(ProviderError::new(
                "scripted",
                ProviderErrorKind::ContentPolicy,
                "refused",
            ))
        });
        let mut sink = ResultSink::in_memory(table(1));

        let outcome = scheduler(1)
            .run(&request(1), &mut sink, provider.clone(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.jobs[0].attempt_count, 1);
        assert_eq!(outcome.failed_count(), 1);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn checkpoints_every_batch_size_completions() {
        let provider = ScriptedProvider::new(|_, _| Ok("x".into()));
        let (reporter, mut events) = ChannelReporter::new(64);
        let mut sink = ResultSink::in_memory(table(5));

        let outcome = scheduler(2)
            .with_reporter(Arc::new(reporter))
            .run(
                &request(5).with_batch_size(2),
                &mut sink,
                provider,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.checkpoints, 2);

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.event_type());
        }
        assert_eq!(kinds.first(), Some(&"batch.started"));
        assert_eq!(kinds.last(), Some(&"batch.finished"));
        assert_eq!(kinds.iter().filter(|k| **k == "batch.checkpoint").count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_skips_the_rest() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let provider = ScriptedProvider::new(move |call, _| {
            if call == 2 {
                trigger.cancel();
            }
            Ok("done".into())
        });
        let mut sink = ResultSink::in_memory(table(8));

        let outcome = scheduler(1)
            .run(&request(8), &mut sink, provider, cancel)
            .await
            .unwrap();

        // The call that triggered cancellation still completes.
        assert_eq!(outcome.succeeded_count(), 3);
        assert_eq!(outcome.skipped_count(), 5);
        assert_eq!(outcome.jobs.len(), 8);
        assert!(outcome.cancelled);
        assert_eq!(outcome.state, BatchState::Cancelled);
        assert_eq!(sink.table().cell(2, "text"), Some("done"));
        assert_eq!(sink.table().cell(3, "text"), Some("item 3"));
    }

    #[tokio::test(start_paused = true)]
    async fn stragglers_are_skipped_after_grace() {
        let cancel = CancellationToken::new();
        let mut sink = ResultSink::in_memory(table(3));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let outcome = scheduler(2)
            .run(&request(3), &mut sink, Arc::new(HangingProvider), cancel)
            .await
            .unwrap();

        assert_eq!(outcome.skipped_count(), 3);
        assert!(outcome.jobs.iter().all(|j| j.status() == JobStatus::Skipped));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_call_fails_its_cell_and_the_rest_still_run() {
        let provider = ScriptedProvider::new(|call, prompt| {
            if call == 0 {
                panic!("provider exploded");
            }
            Ok(cell_of(prompt).to_uppercase())
        });
        let mut sink = ResultSink::in_memory(table(3));

        let outcome = scheduler(1)
            .run(&request(3), &mut sink, provider.clone(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, BatchState::Completed);
        assert!(!outcome.cancelled);
        assert_eq!(
            (
                outcome.succeeded_count(),
                outcome.failed_count(),
                outcome.skipped_count()
            ),
            (2, 1, 0)
        );
        let failed = outcome
            .jobs
            .iter()
            .find(|j| j.status() == JobStatus::Failed)
            .unwrap();
        assert_eq!(failed.row_index, 0);
        assert_eq!(failed.attempt_count, 1);
        assert!(failed.error.as_deref().unwrap_or_default().contains("provider exploded"));
        assert_eq!(provider.calls(), 3);
        assert_eq!(sink.table().cell(0, "text"), Some("item 0"));
        assert_eq!(sink.table().cell(2, "text"), Some("ITEM 2"));
    }

    #[tokio::test]
    async fn setup_error_reports_failure_and_creates_no_jobs() {
        let provider = ScriptedProvider::new(|_, _| Ok("x".into()));
        let (reporter, mut events) = ChannelReporter::new(4);
        let mut sink = ResultSink::in_memory(table(2));

        let mut bad = request(2);
        bad.target_columns = vec!["missing".into()];
        let err = scheduler(1)
            .with_reporter(Arc::new(reporter))
            .run(&bad, &mut sink, provider.clone(), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, SetupError::UnknownColumn("missing".into()));
        assert_eq!(provider.calls(), 0);
        assert_eq!(events.recv().await.unwrap().event_type(), "batch.failed");
    }
}
