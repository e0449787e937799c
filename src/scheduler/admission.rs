//! # Dedup policy and admission results
//!
//! Within a lane, a task key identifies one logical unit of work. When a new
//! submission arrives while a task with the same key is pending or running,
//! the new task's [`DedupPolicy`] decides what happens.
//!
//! ## Variants
//! - `DropNew`: keep the existing task, **ignore** the new request (default).
//! - `Replace`: the new request takes over. A pending duplicate is swapped in
//!   place (keeping its FIFO position); a running duplicate is asked to stop
//!   and the new task goes to the front of the lane.
//! - `AllowOverlap`: no dedup; the task is enqueued like any other.
//!
//! A running task that has already been asked to stop does not count as a
//! duplicate.

use crate::tasks::TaskId;

/// Policy controlling how a submission is handled when its key is already in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Drop the new submission, keep the existing one.
    ///
    /// Use when repeated triggers (rapid re-selection, double clicks) should
    /// not produce redundant work.
    #[default]
    DropNew,

    /// The newest submission wins.
    ///
    /// Use when the payload may have changed between submissions and only the
    /// latest one is meaningful.
    Replace,

    /// Every submission runs, in FIFO order.
    AllowOverlap,
}

/// What [`Scheduler::submit`](crate::Scheduler::submit) did with a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Accepted and promoted to the running slot within the call.
    Started(TaskId),

    /// Accepted and waiting in the lane's FIFO.
    Queued(TaskId),

    /// Dropped; the task with this id already covers the key.
    Duplicate(TaskId),

    /// Accepted as `id`, superseding `replaced`.
    ///
    /// A replaced pending task is cancelled; a replaced running task has been
    /// asked to stop and `id` waits at the front of the lane.
    Replaced { id: TaskId, replaced: TaskId },
}

impl Admission {
    /// Id of the task now tracked for the submitted key.
    pub fn id(&self) -> TaskId {
        match *self {
            Admission::Started(id)
            | Admission::Queued(id)
            | Admission::Duplicate(id)
            | Admission::Replaced { id, .. } => id,
        }
    }

    /// False when the submission was dropped as a duplicate.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Admission::Duplicate(_))
    }
}
