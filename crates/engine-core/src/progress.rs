use model::events::{BatchEvent, Event};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Observer of a running batch. Called from the coordinating task only, so
/// implementations must not block.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &BatchEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: &BatchEvent) {}
}

/// Writes events to the tracing subscriber. Per-cell chatter goes to debug.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: &BatchEvent) {
        match event {
            BatchEvent::CellFinished { .. } | BatchEvent::RetryScheduled { .. } => {
                debug!(event_type = event.event_type(), "{event}");
            }
            BatchEvent::PersistFailed { .. } | BatchEvent::Failed { .. } => {
                warn!(event_type = event.event_type(), "{event}");
            }
            _ => info!(event_type = event.event_type(), "{event}"),
        }
    }
}

/// Forwards events into a bounded channel for a UI or test to drain.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::Sender<BatchEvent>,
}

impl ChannelReporter {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BatchEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ChannelReporter { tx }, rx)
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, event: &BatchEvent) {
        // try_send is non-blocking. A slow subscriber loses events rather than
        // stalling the coordinator.
        if let Err(e) = self.tx.try_send(event.clone()) {
            warn!(
                event_type = event.event_type(),
                error = %e,
                "Dropped progress event for slow subscriber"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn failed_event() -> BatchEvent {
        BatchEvent::Failed {
            run_id: "run-1".into(),
            error: "no columns".into(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn channel_reporter_forwards_events() {
        let (reporter, mut rx) = ChannelReporter::new(4);
        reporter.report(&failed_event());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "batch.failed");
    }

    #[traced_test]
    #[test]
    fn channel_reporter_drops_when_full() {
        let (reporter, _rx) = ChannelReporter::new(1);
        reporter.report(&failed_event());
        reporter.report(&failed_event());
        assert!(logs_contain("Dropped progress event"));
    }
}
