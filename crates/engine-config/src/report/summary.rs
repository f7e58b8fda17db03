use crate::error::ReportGenerationError;
use chrono::{DateTime, Utc};
use engine_core::metrics::MetricsSnapshot;
use model::jobs::{BatchOutcome, BatchState};
use serde::Serialize;
use std::{fs, path::Path};
use tracing::info;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FailedCell {
    pub row: usize,
    pub column: String,
    pub attempts: u32,
    pub error: String,
}

/// Machine-readable summary of one batch run.
#[derive(Serialize, Debug, Clone)]
pub struct SummaryReport {
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub state: BatchState,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub checkpoints: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_warning: Option<String>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedCell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSnapshot>,
    pub generated_at: DateTime<Utc>,
}

impl SummaryReport {
    pub fn from_outcome(outcome: &BatchOutcome) -> Self {
        let mut failures: Vec<FailedCell> = outcome
            .failed_jobs()
            .map(|job| FailedCell {
                row: job.row_index,
                column: job.column_name.clone(),
                attempts: job.attempt_count,
                error: job.error.clone().unwrap_or_default(),
            })
            .collect();
        failures.sort_by(|a, b| (a.row, &a.column).cmp(&(b.row, &b.column)));

        SummaryReport {
            run_id: outcome.run_id.to_string(),
            step: None,
            state: outcome.state,
            total: outcome.jobs.len(),
            succeeded: outcome.succeeded_count(),
            failed: outcome.failed_count(),
            skipped: outcome.skipped_count(),
            cancelled: outcome.cancelled,
            checkpoints: outcome.checkpoints,
            persist_warning: outcome.persist_warning.clone(),
            duration_ms: outcome.duration_ms,
            failures,
            metrics: None,
            generated_at: Utc::now(),
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsSnapshot) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn to_json(&self) -> Result<String, ReportGenerationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes one or more reports as a pretty JSON array.
pub fn write_reports(
    reports: &[SummaryReport],
    path: &Path,
) -> Result<(), ReportGenerationError> {
    let json = serde_json::to_string_pretty(reports)?;
    fs::write(path, json).map_err(|source| ReportGenerationError::Write {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), reports = reports.len(), "Wrote summary report");
    Ok(())
}
