use crate::{
    events::Event,
    jobs::{cell_job::JobStatus, outcome::BatchState},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything a progress observer can learn about a running batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// Emitted once jobs are built and workers are about to start
    Started {
        run_id: String,
        total_jobs: usize,
        workers: usize,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a single cell reaches a terminal state
    CellFinished {
        run_id: String,
        position: usize,
        row: usize,
        column: String,
        status: JobStatus,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// Emitted before a worker sleeps ahead of another attempt
    RetryScheduled {
        run_id: String,
        row: usize,
        column: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Emitted every `batch_size` completed jobs
    Checkpoint {
        run_id: String,
        index: usize,
        completed: usize,
        total: usize,
        /// Highest logical position completed so far
        last_position: usize,
        persisted: bool,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an auto-save could not be written
    PersistFailed {
        run_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when the coordinator observes cancellation
    CancelRequested {
        run_id: String,
        completed: usize,
        in_flight: usize,
        timestamp: DateTime<Utc>,
    },

    /// Emitted once the batch reaches Completed or Cancelled
    Finished {
        run_id: String,
        state: BatchState,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a request is rejected before any dispatch
    Failed {
        run_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl BatchEvent {
    pub fn run_id(&self) -> &str {
        match self {
            BatchEvent::Started { run_id, .. }
            | BatchEvent::CellFinished { run_id, .. }
            | BatchEvent::RetryScheduled { run_id, .. }
            | BatchEvent::Checkpoint { run_id, .. }
            | BatchEvent::PersistFailed { run_id, .. }
            | BatchEvent::CancelRequested { run_id, .. }
            | BatchEvent::Finished { run_id, .. }
            | BatchEvent::Failed { run_id, .. } => run_id,
        }
    }
}

impl Event for BatchEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BatchEvent::Started { .. } => "batch.started",
            BatchEvent::CellFinished { .. } => "batch.cell_finished",
            BatchEvent::RetryScheduled { .. } => "batch.retry_scheduled",
            BatchEvent::Checkpoint { .. } => "batch.checkpoint",
            BatchEvent::PersistFailed { .. } => "batch.persist_failed",
            BatchEvent::CancelRequested { .. } => "batch.cancel_requested",
            BatchEvent::Finished { .. } => "batch.finished",
            BatchEvent::Failed { .. } => "batch.failed",
        }
    }
}

impl fmt::Display for BatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchEvent::Started {
                run_id,
                total_jobs,
                workers,
                ..
            } => write!(
                f,
                "[{run_id}] started: {total_jobs} cells on {workers} workers"
            ),
            BatchEvent::CellFinished {
                run_id,
                row,
                column,
                status,
                attempts,
                ..
            } => write!(
                f,
                "[{run_id}] cell ({row}, {column}) {status} after {attempts} attempt(s)"
            ),
            BatchEvent::RetryScheduled {
                run_id,
                row,
                column,
                attempt,
                delay_ms,
                error,
                ..
            } => write!(
                f,
                "[{run_id}] retrying ({row}, {column}) after attempt {attempt} in {delay_ms}ms: {error}"
            ),
            BatchEvent::Checkpoint {
                run_id,
                index,
                completed,
                total,
                persisted,
                ..
            } => write!(
                f,
                "[{run_id}] checkpoint #{index}: {completed}/{total} cells (saved: {persisted})"
            ),
            BatchEvent::PersistFailed { run_id, error, .. } => {
                write!(f, "[{run_id}] auto-save failed: {error}")
            }
            BatchEvent::CancelRequested {
                run_id,
                completed,
                in_flight,
                ..
            } => write!(
                f,
                "[{run_id}] cancellation requested: {completed} done, {in_flight} in flight"
            ),
            BatchEvent::Finished {
                run_id,
                state,
                succeeded,
                failed,
                skipped,
                duration_ms,
                ..
            } => write!(
                f,
                "[{run_id}] {state}: {succeeded} succeeded, {failed} failed, {skipped} skipped in {duration_ms}ms"
            ),
            BatchEvent::Failed { run_id, error, .. } => {
                write!(f, "[{run_id}] failed before dispatch: {error}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_snake_case_tag() {
        let event = BatchEvent::Checkpoint {
            run_id: "run-1".into(),
            index: 2,
            completed: 4,
            total: 5,
            last_position: 3,
            persisted: true,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "checkpoint");
        assert_eq!(json["completed"], 4);
        assert_eq!(event.event_type(), "batch.checkpoint");
        assert_eq!(event.run_id(), "run-1");
    }

    #[test]
    fn finished_event_reads_back_its_state() {
        let json = r#"{
            "type": "finished",
            "run_id": "run-7",
            "state": "Cancelled",
            "succeeded": 3,
            "failed": 0,
            "skipped": 5,
            "duration_ms": 120,
            "timestamp": "2025-01-01T00:00:00Z"
        }"#;

        let event: BatchEvent = serde_json::from_str(json).unwrap();
        match event {
            BatchEvent::Finished { state, skipped, .. } => {
                assert_eq!(state, BatchState::Cancelled);
                assert_eq!(skipped, 5);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
