//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per run. Shared state goes into an explicit `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use worklane::{Lane, TaskError, TaskFn, TaskKey, TaskRef};
//!
//! let t: TaskRef<u32> = TaskFn::arc(
//!     TaskKey::new("bpm", "tracks/a.flac"),
//!     Lane::Standard,
//!     |ctx: CancellationToken| async move {
//!         if ctx.is_cancelled() {
//!             return Err(TaskError::Canceled);
//!         }
//!         Ok(128)
//!     },
//! );
//!
//! assert_eq!(t.key().kind(), "bpm");
//! assert_eq!(t.lane(), Lane::Standard);
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::scheduler::DedupPolicy;
use crate::tasks::{Lane, Task, TaskKey};

/// Function-backed task implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    key: TaskKey,
    lane: Lane,
    dedup: DedupPolicy,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task with the default dedup policy.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(key: TaskKey, lane: Lane, f: F) -> Self {
        Self {
            key,
            lane,
            dedup: DedupPolicy::default(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(key: TaskKey, lane: Lane, f: F) -> Arc<Self> {
        Arc::new(Self::new(key, lane, f))
    }

    /// Overrides the dedup policy.
    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }
}

#[async_trait]
impl<F, Fut, O> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, TaskError>> + Send + 'static,
    O: Send + 'static,
{
    type Output = O;

    fn key(&self) -> &TaskKey {
        &self.key
    }

    fn lane(&self) -> Lane {
        self.lane
    }

    fn dedup(&self) -> DedupPolicy {
        self.dedup
    }

    async fn run(&self, ctx: CancellationToken) -> Result<O, TaskError> {
        (self.f)(ctx).await
    }
}
