use crate::{
    core::identifiers::RunId,
    jobs::cell_job::{CellJob, JobStatus},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Idle => "Idle",
            BatchState::Running => "Running",
            BatchState::Completed => "Completed",
            BatchState::Cancelled => "Cancelled",
            BatchState::Failed => "Failed",
        }
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one batch run. `jobs` are in completion order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub run_id: RunId,
    pub state: BatchState,
    pub jobs: Vec<CellJob>,
    pub cancelled: bool,
    pub checkpoints: usize,
    /// Set when an auto-save failed; in-memory edits are kept regardless.
    pub persist_warning: Option<String>,
    pub duration_ms: u64,
}

impl BatchOutcome {
    pub fn succeeded_count(&self) -> usize {
        self.count(JobStatus::Succeeded)
    }

    pub fn failed_count(&self) -> usize {
        self.count(JobStatus::Failed)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(JobStatus::Skipped)
    }

    pub fn failed_jobs(&self) -> impl Iterator<Item = &CellJob> {
        self.jobs
            .iter()
            .filter(|job| job.status() == JobStatus::Failed)
    }

    pub fn job_for(&self, row: usize, column: &str) -> Option<&CellJob> {
        self.jobs
            .iter()
            .find(|job| job.row_index == row && job.column_name == column)
    }

    fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|job| job.status() == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_derived_from_jobs() {
        let mut ok = CellJob::new(0, 0, "a", "x");
        ok.start().unwrap();
        ok.succeed("y").unwrap();

        let mut bad = CellJob::new(1, 1, "a", "x");
        bad.start().unwrap();
        bad.fail("nope").unwrap();

        let mut skipped = CellJob::new(2, 2, "a", "x");
        skipped.skip().unwrap();

        let outcome = BatchOutcome {
            run_id: RunId::from("run-test"),
            state: BatchState::Cancelled,
            jobs: vec![ok, bad, skipped],
            cancelled: true,
            checkpoints: 0,
            persist_warning: None,
            duration_ms: 0,
        };

        assert_eq!(outcome.succeeded_count(), 1);
        assert_eq!(outcome.failed_count(), 1);
        assert_eq!(outcome.skipped_count(), 1);
        assert_eq!(outcome.failed_jobs().count(), 1);
        assert_eq!(
            outcome.job_for(1, "a").and_then(|j| j.error.as_deref()),
            Some("nope")
        );
    }
}
