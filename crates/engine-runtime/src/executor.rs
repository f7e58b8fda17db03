use crate::{error::RunError, factory};
use engine_config::{
    report::summary::SummaryReport,
    settings::{ProcessingSettings, ValidatedSettings},
};
use engine_core::{
    connectors::provider::CompletionProvider,
    metrics::Metrics,
    progress::{ProgressReporter, TracingReporter},
    rate_limit::RateLimiter,
};
use engine_processing::{
    scheduler::{BatchScheduler, SchedulerConfig},
    sink::ResultSink,
};
use model::{
    jobs::{BatchOutcome, BatchRequest, PromptTemplate, RowRange},
    records::table::Table,
};
use std::{path::Path, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// What to transform. Everything not named here comes from settings.
#[derive(Debug, Clone, Default)]
pub struct TaskSpec {
    /// Defaults to every row of the table
    pub rows: Option<RowRange>,
    pub targets: Vec<String>,
    pub context: Vec<String>,
    /// Defaults to the configured system prompt
    pub system_prompt: Option<String>,
    pub user_prompt: String,
}

/// Outcome of one run plus its serialisable summary.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: BatchOutcome,
    pub summary: SummaryReport,
}

/// Turns settings into schedulers and runs tasks against tables.
///
/// All runs started from one executor share a single rate limiter, so
/// consecutive workflow steps draw from the same per-minute budget.
pub struct Executor {
    settings: ProcessingSettings,
    validated: ValidatedSettings,
    limiter: Arc<RateLimiter>,
    reporter: Arc<dyn ProgressReporter>,
}

impl Executor {
    pub fn new(settings: ProcessingSettings, validated: ValidatedSettings) -> Self {
        let limiter = Arc::new(RateLimiter::per_minute(validated.rate_limit));
        Self {
            settings,
            validated,
            limiter,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn settings(&self) -> &ProcessingSettings {
        &self.settings
    }

    pub fn validated(&self) -> &ValidatedSettings {
        &self.validated
    }

    pub fn scheduler(&self, metrics: Metrics) -> BatchScheduler {
        BatchScheduler::new(
            SchedulerConfig::from_settings(&self.validated),
            self.limiter.clone(),
        )
        .with_reporter(self.reporter.clone())
        .with_metrics(metrics)
    }

    pub fn build_request(&self, task: &TaskSpec, table: &Table) -> BatchRequest {
        let rows = task
            .rows
            .unwrap_or_else(|| RowRange::new(0, table.row_count().saturating_sub(1)));
        let system_prompt = task
            .system_prompt
            .clone()
            .unwrap_or_else(|| self.settings.default_system_prompt.clone());

        BatchRequest::new(
            rows,
            task.targets.clone(),
            PromptTemplate::new(system_prompt, task.user_prompt.clone()),
        )
        .with_context(task.context.clone())
        .with_auto_save(self.validated.auto_save)
        .with_max_retries(self.validated.max_retries)
        .with_batch_size(self.validated.batch_size)
        .with_sampling(self.validated.temperature, self.validated.max_tokens)
    }

    /// Runs one task against a table that is already loaded into `sink`.
    pub async fn run_task(
        &self,
        task: &TaskSpec,
        sink: &mut ResultSink,
        provider: Arc<dyn CompletionProvider>,
        cancel: CancellationToken,
    ) -> Result<RunReport, RunError> {
        let request = self.build_request(task, sink.table());
        let metrics = Metrics::new();
        let outcome = self
            .scheduler(metrics.clone())
            .run(&request, sink, provider, cancel)
            .await?;

        let summary = SummaryReport::from_outcome(&outcome).with_metrics(metrics.snapshot());
        Ok(RunReport { outcome, summary })
    }

    /// Loads `path`, runs the task and leaves the file saved according to
    /// the auto-save setting.
    pub async fn run_file(
        &self,
        path: &Path,
        task: &TaskSpec,
        provider: Arc<dyn CompletionProvider>,
        cancel: CancellationToken,
    ) -> Result<RunReport, RunError> {
        let store = factory::create_store(path)?;
        let table = store.load()?;
        info!(
            location = %store.location(),
            rows = table.row_count(),
            "Running task against file"
        );

        let mut sink = ResultSink::with_store(table, store);
        self.run_task(task, &mut sink, provider, cancel).await
    }
}
