//! # Task bookkeeping types: ids, states, outcomes.
//!
//! ## State machine
//! ```text
//! Queued ──► Running ──► Finished
//!   │           ├──────► Failed
//!   │           └──────► Cancelled
//!   └──────────────────► Cancelled   (removed while pending)
//! ```
//! Terminal states are final. Any other transition is a scheduler bug and panics.

use std::fmt;

use crate::error::TaskError;
use crate::tasks::{Lane, TaskKey};

/// Per-scheduler submission id, monotonically increasing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a submitted task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Finished,
    Failed,
    Cancelled,
}

impl TaskState {
    /// True for `Finished`, `Failed` and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Finished | TaskState::Failed | TaskState::Cancelled
        )
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(&self, next: TaskState) -> bool {
        match (self, next) {
            (TaskState::Queued, TaskState::Running | TaskState::Cancelled) => true,
            (
                TaskState::Running,
                TaskState::Finished | TaskState::Failed | TaskState::Cancelled,
            ) => true,
            _ => false,
        }
    }

    /// Moves to `next`.
    ///
    /// # Panics
    /// On an illegal transition: that would break the per-lane accounting.
    pub(crate) fn advance(&mut self, next: TaskState) {
        assert!(
            self.can_advance_to(next),
            "illegal task state transition {self:?} -> {next:?}"
        );
        *self = next;
    }
}

/// Identity of a submitted task as seen by listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskMeta {
    /// Submission id.
    pub id: TaskId,
    /// Identity key used by the dedup guard.
    pub key: TaskKey,
    /// Lane the task belongs to.
    pub lane: Lane,
}

/// Terminal result of a task, produced exactly once.
#[derive(Debug)]
pub enum Outcome<O> {
    /// `run` returned a value.
    Finished(O),
    /// `run` returned an error (or panicked).
    Failed(TaskError),
    /// Cancellation was requested and the task stopped.
    Cancelled,
}

impl<O> Outcome<O> {
    /// Terminal state matching this outcome.
    pub fn state(&self) -> TaskState {
        match self {
            Outcome::Finished(_) => TaskState::Finished,
            Outcome::Failed(_) => TaskState::Failed,
            Outcome::Cancelled => TaskState::Cancelled,
        }
    }
}
