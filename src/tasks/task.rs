//! # Task abstraction.
//!
//! A task receives a [`CancellationToken`] and should check it periodically;
//! the scheduler cancels it on [`Scheduler::cancel`](crate::Scheduler::cancel),
//! on replacement and on shutdown. There is no forced preemption.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::scheduler::DedupPolicy;
use crate::tasks::{Lane, TaskKey};

/// # Asynchronous, cancelable unit of work.
///
/// Tasks are opaque to the scheduler beyond [`key`](Task::key),
/// [`lane`](Task::lane), [`dedup`](Task::dedup) and [`run`](Task::run).
/// They must not touch state owned by the interactive context directly:
/// visible effects flow back through the returned output.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use worklane::{Lane, Task, TaskError, TaskKey};
///
/// struct Waveform {
///     key: TaskKey,
/// }
///
/// #[async_trait]
/// impl Task for Waveform {
///     type Output = Vec<f32>;
///
///     fn key(&self) -> &TaskKey { &self.key }
///     fn lane(&self) -> Lane { Lane::Instant }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<Vec<f32>, TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         Ok(vec![0.0; 128])
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Value produced by a successful run.
    type Output: Send + 'static;

    /// Identity used by the dedup guard.
    fn key(&self) -> &TaskKey;

    /// Lane the task runs in. Must not change over the task's lifetime.
    fn lane(&self) -> Lane;

    /// What to do when a task with the same key is already queued or running.
    fn dedup(&self) -> DedupPolicy {
        DedupPolicy::DropNew
    }

    /// Executes the task.
    ///
    /// Implementations should watch `ctx` and return [`TaskError::Canceled`]
    /// promptly once it fires.
    async fn run(&self, ctx: CancellationToken) -> Result<Self::Output, TaskError>;
}

/// Shared handle to a task producing `O`.
pub type TaskRef<O> = Arc<dyn Task<Output = O>>;
