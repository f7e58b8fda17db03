use crate::scheduler::worker::Worker;
use std::{any::Any, collections::HashMap};
use tokio::task::{Id, JoinError, JoinSet};

/// How a worker task ended.
pub(crate) enum WorkerExit {
    Stopped,
    Panicked { worker: usize, message: String },
}

/// Worker tasks cloned from one prototype, so a crashed worker can be
/// replaced and the queue keeps draining.
pub(crate) struct WorkerPool {
    prototype: Worker,
    tasks: JoinSet<()>,
    ids: HashMap<Id, usize>,
    spawned: usize,
}

impl WorkerPool {
    pub fn new(prototype: Worker) -> Self {
        WorkerPool {
            prototype,
            tasks: JoinSet::new(),
            ids: HashMap::new(),
            spawned: 0,
        }
    }

    pub fn spawn(&mut self) {
        let worker = Worker {
            id: self.spawned,
            ..self.prototype.clone()
        };
        let handle = self.tasks.spawn(worker.run());
        self.ids.insert(handle.id(), self.spawned);
        self.spawned += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Next finished worker, or `None` once the pool is empty.
    pub async fn join_next(&mut self) -> Option<WorkerExit> {
        let joined = self.tasks.join_next_with_id().await?;
        Some(match joined {
            Ok((id, ())) => {
                self.ids.remove(&id);
                WorkerExit::Stopped
            }
            Err(err) => self.exit_of(err),
        })
    }

    pub fn abort_all(&mut self) {
        self.tasks.abort_all();
    }

    fn exit_of(&mut self, err: JoinError) -> WorkerExit {
        let worker = self.ids.remove(&err.id());
        match (worker, err.is_panic()) {
            (Some(worker), true) => WorkerExit::Panicked {
                worker,
                message: panic_message(err.into_panic()),
            },
            _ => WorkerExit::Stopped,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
