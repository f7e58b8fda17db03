use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InFlight,
    Succeeded,
    Failed,
    Skipped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InFlight => "in_flight",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Skipped
        )
    }

    /// Status only moves forward: Pending -> InFlight -> terminal, or
    /// Pending -> Skipped when a batch is cancelled before dispatch.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::InFlight)
                | (JobStatus::Pending, JobStatus::Skipped)
                | (JobStatus::InFlight, JobStatus::Succeeded)
                | (JobStatus::InFlight, JobStatus::Failed)
                | (JobStatus::InFlight, JobStatus::Skipped)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid job transition for row {row} column '{column}': {from} -> {to}")]
pub struct TransitionError {
    pub row: usize,
    pub column: String,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// A context column value included when transforming a different column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub column: String,
    pub value: String,
}

/// One target cell of a batch together with everything needed to transform it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellJob {
    /// Logical dispatch position within the batch (row-major, then target order).
    pub position: usize,
    pub row_index: usize,
    pub column_name: String,
    pub cell_value: String,
    pub context: Vec<ContextEntry>,
    pub system_prompt: String,
    pub user_prompt: String,
    pub attempt_count: u32,
    status: JobStatus,
    pub result_text: Option<String>,
    pub error: Option<String>,
}

impl CellJob {
    pub fn new(
        position: usize,
        row_index: usize,
        column_name: impl Into<String>,
        cell_value: impl Into<String>,
    ) -> Self {
        CellJob {
            position,
            row_index,
            column_name: column_name.into(),
            cell_value: cell_value.into(),
            context: Vec::new(),
            system_prompt: String::new(),
            user_prompt: String::new(),
            attempt_count: 0,
            status: JobStatus::Pending,
            result_text: None,
            error: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::InFlight)
    }

    pub fn succeed(&mut self, text: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Succeeded)?;
        self.result_text = Some(text.into());
        self.error = None;
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    pub fn skip(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Skipped)
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                row: self.row_index,
                column: self.column_name.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> CellJob {
        CellJob::new(0, 3, "phone", "555-123-4567")
    }

    #[test]
    fn happy_path_reaches_succeeded() {
        let mut job = job();
        job.start().unwrap();
        job.succeed("(555) 123-4567").unwrap();
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert_eq!(job.result_text.as_deref(), Some("(555) 123-4567"));
    }

    #[test]
    fn pending_job_can_be_skipped() {
        let mut job = job();
        job.skip().unwrap();
        assert_eq!(job.status(), JobStatus::Skipped);
    }

    #[test]
    fn terminal_states_never_regress() {
        let mut job = job();
        job.start().unwrap();
        job.fail("boom").unwrap();

        let err = job.start().unwrap_err();
        assert_eq!(err.from, JobStatus::Failed);
        assert_eq!(err.to, JobStatus::InFlight);
        assert!(job.skip().is_err());
        assert!(job.succeed("late").is_err());
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn pending_cannot_jump_to_result() {
        let mut job = job();
        assert!(job.succeed("x").is_err());
        assert!(job.fail("x").is_err());
        assert_eq!(job.status(), JobStatus::Pending);
    }
}
