use tokio::sync::mpsc;

use crate::tasks::{TaskKey, TaskRef};

use super::error::SubmitError;

/// Request sent from a [`SchedulerHandle`] to the owning context.
pub(super) enum Command<O> {
    Submit {
        task: TaskRef<O>,
        run_immediately: bool,
    },
    Cancel {
        key: TaskKey,
    },
}

/// Cloneable, `Send` handle for submitting from other threads.
///
/// Commands are queued and applied by the owning context the next time it
/// calls [`Scheduler::turn`](crate::Scheduler::turn) or
/// [`Scheduler::poll_completions`](crate::Scheduler::poll_completions).
/// Use it for batch triggers and for follow-up tasks submitted from listeners.
pub struct SchedulerHandle<O> {
    pub(super) tx: mpsc::Sender<Command<O>>,
}

impl<O> Clone for SchedulerHandle<O> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<O: Send + 'static> SchedulerHandle<O> {
    /// Submit a task (async, waits if the queue is full).
    pub async fn submit(&self, task: TaskRef<O>, run_immediately: bool) -> Result<(), SubmitError> {
        self.tx
            .send(Command::Submit {
                task,
                run_immediately,
            })
            .await
            .map_err(|_| SubmitError::Closed)
    }

    /// Try to submit without waiting (fails if the queue is full).
    pub fn try_submit(&self, task: TaskRef<O>, run_immediately: bool) -> Result<(), SubmitError> {
        self.try_send(Command::Submit {
            task,
            run_immediately,
        })
    }

    /// Ask the owning context to cancel every task with `key` (waits if the queue is full).
    pub async fn cancel(&self, key: TaskKey) -> Result<(), SubmitError> {
        self.tx
            .send(Command::Cancel { key })
            .await
            .map_err(|_| SubmitError::Closed)
    }

    /// Ask the owning context to cancel every task with `key`, without waiting.
    pub fn try_cancel(&self, key: TaskKey) -> Result<(), SubmitError> {
        self.try_send(Command::Cancel { key })
    }

    fn try_send(&self, cmd: Command<O>) -> Result<(), SubmitError> {
        self.tx.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::Full,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}
