use crate::{scheduler::worker::WorkerReport, sink::ResultSink};
use chrono::Utc;
use engine_core::{metrics::Metrics, progress::ProgressReporter};
use model::{
    core::identifiers::RunId,
    events::BatchEvent,
    jobs::{BatchOutcome, BatchState, CellJob, JobStatus},
};
use std::{collections::HashMap, sync::Arc, time::Instant};
use tracing::{info, warn};

/// Coordinator-owned view of a run. Only the coordinating task touches it,
/// so job transitions, sink commits and checkpoints are strictly ordered.
pub(crate) struct RunState {
    pub run_id: RunId,
    jobs: Vec<CellJob>,
    completion_order: Vec<usize>,
    uncommitted: Vec<usize>,
    completed: usize,
    in_flight: usize,
    /// Worker id to the position it is currently working on.
    holding: HashMap<usize, usize>,
    checkpoints: usize,
    last_position: Option<usize>,
    persist_warning: Option<String>,
    batch_size: usize,
    auto_save: bool,
    reporter: Arc<dyn ProgressReporter>,
    metrics: Metrics,
}

impl RunState {
    pub fn new(
        run_id: RunId,
        jobs: Vec<CellJob>,
        batch_size: usize,
        auto_save: bool,
        reporter: Arc<dyn ProgressReporter>,
        metrics: Metrics,
    ) -> Self {
        let total = jobs.len();
        RunState {
            run_id,
            jobs,
            completion_order: Vec::with_capacity(total),
            uncommitted: Vec::with_capacity(batch_size),
            completed: 0,
            in_flight: 0,
            holding: HashMap::new(),
            checkpoints: 0,
            last_position: None,
            persist_warning: None,
            batch_size: batch_size.max(1),
            auto_save,
            reporter,
            metrics,
        }
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn handle(&mut self, report: WorkerReport, sink: &mut ResultSink) {
        match report {
            WorkerReport::Dispatched { worker, position } => {
                if let Err(e) = self.jobs[position].start() {
                    warn!(error = %e, "Ignoring dispatch of a job that is not pending");
                    return;
                }
                self.holding.insert(worker, position);
                self.in_flight += 1;
            }
            WorkerReport::RetryScheduled {
                position,
                attempt,
                delay,
                error,
            } => {
                let job = &mut self.jobs[position];
                job.attempt_count = attempt;
                self.metrics.increment_retries(1);
                self.reporter.report(&BatchEvent::RetryScheduled {
                    run_id: self.run_id.to_string(),
                    row: job.row_index,
                    column: job.column_name.clone(),
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                    error,
                    timestamp: Utc::now(),
                });
            }
            WorkerReport::Finished {
                position,
                attempts,
                result,
            } => {
                self.release(position);
                let job = &mut self.jobs[position];
                job.attempt_count = attempts;

                let transition = match result {
                    Ok(text) => job.succeed(text),
                    Err(error) => job.fail(error),
                };
                if let Err(e) = transition {
                    warn!(error = %e, "Ignoring result for a job that is not in flight");
                    return;
                }

                match job.status() {
                    JobStatus::Succeeded => self.metrics.increment_succeeded(1),
                    _ => self.metrics.increment_failed(1),
                }

                self.completed += 1;
                self.last_position = Some(self.last_position.map_or(position, |p| p.max(position)));
                self.completion_order.push(position);
                self.uncommitted.push(position);
                self.report_cell(position);

                if self.completed % self.batch_size == 0 {
                    self.checkpoint(sink);
                }
            }
            WorkerReport::Abandoned { position, attempts } => {
                self.release(position);
                self.jobs[position].attempt_count = attempts;
            }
        }
    }

    /// Fails the job a crashed worker was holding, if any.
    pub fn worker_panicked(&mut self, worker: usize, message: &str, sink: &mut ResultSink) {
        let Some(&position) = self.holding.get(&worker) else {
            warn!(run_id = %self.run_id, worker, panic = message, "Idle worker panicked");
            return;
        };
        warn!(
            run_id = %self.run_id,
            worker,
            row = self.jobs[position].row_index,
            column = %self.jobs[position].column_name,
            panic = message,
            "Worker panicked, failing its cell"
        );
        let attempts = self.jobs[position].attempt_count + 1;
        self.handle(
            WorkerReport::Finished {
                position,
                attempts,
                result: Err(format!("worker panicked: {message}")),
            },
            sink,
        );
    }

    fn release(&mut self, position: usize) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.holding.retain(|_, held| *held != position);
    }

    /// Commits completed jobs, persists when auto-save is on and announces
    /// the checkpoint.
    fn checkpoint(&mut self, sink: &mut ResultSink) {
        let persisted = self.flush(sink);
        self.checkpoints += 1;
        self.metrics.increment_checkpoints(1);

        info!(
            run_id = %self.run_id,
            checkpoint = self.checkpoints,
            completed = self.completed,
            total = self.total(),
            "Checkpoint reached"
        );
        self.reporter.report(&BatchEvent::Checkpoint {
            run_id: self.run_id.to_string(),
            index: self.checkpoints,
            completed: self.completed,
            total: self.total(),
            last_position: self.last_position.unwrap_or_default(),
            persisted,
            timestamp: Utc::now(),
        });
    }

    /// Hands uncommitted results to the sink, then saves if configured.
    /// Returns whether the table was written out.
    fn flush(&mut self, sink: &mut ResultSink) -> bool {
        let committed = sink.commit(self.uncommitted.iter().map(|&p| &self.jobs[p]));
        if let Err(e) = committed {
            warn!(run_id = %self.run_id, error = %e, "Failed to apply results to table");
        }
        self.uncommitted.clear();

        match sink.maybe_persist(self.auto_save) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "Auto-save failed, keeping edits in memory");
                self.metrics.increment_persist_failures(1);
                self.reporter.report(&BatchEvent::PersistFailed {
                    run_id: self.run_id.to_string(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                self.persist_warning = Some(e.to_string());
                false
            }
        }
    }

    pub fn report_cancel(&self) {
        self.reporter.report(&BatchEvent::CancelRequested {
            run_id: self.run_id.to_string(),
            completed: self.completed,
            in_flight: self.in_flight,
            timestamp: Utc::now(),
        });
    }

    fn report_cell(&self, position: usize) {
        let job = &self.jobs[position];
        self.reporter.report(&BatchEvent::CellFinished {
            run_id: self.run_id.to_string(),
            position,
            row: job.row_index,
            column: job.column_name.clone(),
            status: job.status(),
            attempts: job.attempt_count,
            timestamp: Utc::now(),
        });
    }

    /// Skips whatever never reached a result, flushes the tail and builds
    /// the outcome with jobs in completion order. Only a requested
    /// cancellation that left cells unfinished yields `Cancelled`.
    pub fn finish(
        mut self,
        sink: &mut ResultSink,
        started: Instant,
        cancel_requested: bool,
    ) -> BatchOutcome {
        for position in 0..self.jobs.len() {
            if self.jobs[position].is_terminal() {
                continue;
            }
            if let Err(e) = self.jobs[position].skip() {
                warn!(error = %e, "Could not skip unfinished job");
                continue;
            }
            self.metrics.increment_skipped(1);
            self.completion_order.push(position);
            self.report_cell(position);
        }

        self.flush(sink);

        let mut slots: Vec<Option<CellJob>> = self.jobs.drain(..).map(Some).collect();
        let jobs: Vec<CellJob> = self
            .completion_order
            .iter()
            .filter_map(|&p| slots[p].take())
            .collect();

        let skipped = jobs.iter().filter(|j| j.status() == JobStatus::Skipped).count();
        let cancelled = cancel_requested && skipped > 0;
        let outcome = BatchOutcome {
            run_id: self.run_id.clone(),
            state: if cancelled {
                BatchState::Cancelled
            } else {
                BatchState::Completed
            },
            jobs,
            cancelled,
            checkpoints: self.checkpoints,
            persist_warning: self.persist_warning.take(),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            run_id = %outcome.run_id,
            state = %outcome.state,
            succeeded = outcome.succeeded_count(),
            failed = outcome.failed_count(),
            skipped = outcome.skipped_count(),
            duration_ms = outcome.duration_ms,
            "Batch finished"
        );
        self.reporter.report(&BatchEvent::Finished {
            run_id: outcome.run_id.to_string(),
            state: outcome.state,
            succeeded: outcome.succeeded_count(),
            failed: outcome.failed_count(),
            skipped: outcome.skipped_count(),
            duration_ms: outcome.duration_ms,
            timestamp: Utc::now(),
        });

        outcome
    }
}
