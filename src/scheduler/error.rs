use thiserror::Error;

/// Error returned by [`SchedulerHandle`](crate::SchedulerHandle) submissions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// Command queue is full (try again later or use async `submit`).
    #[error("submission queue full")]
    Full,

    /// The scheduler was dropped or shut down.
    #[error("scheduler channel closed")]
    Closed,
}
