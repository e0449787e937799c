//! Error types used by the scheduler and by tasks.
//!
//! - [`RuntimeError`] - errors raised by the scheduler itself (shutdown).
//! - [`TaskError`] - errors raised by individual task executions.
//!
//! Both types provide `as_label` for logs/metrics. [`TaskError::as_message`]
//! returns the exact failure detail, which is what error statuses display.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the scheduler runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; the listed tasks were aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; aborting")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Keys of the tasks that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use worklane::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors produced by task execution.
///
/// A failed execution is never retried; the error is delivered as-is to the
/// `on_error` listeners of the task.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task execution failed with a plain message.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task execution failed with an error that carries a cause chain.
    #[error("execution failed: {0:#}")]
    Source(#[from] anyhow::Error),

    /// Task future panicked; the panic was caught by the scheduler.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Task observed cancellation and stopped.
    #[error("task cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use worklane::TaskError;
    ///
    /// let err = TaskError::fail("model not loaded");
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Source(_) => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns the failure detail without the `Display` prefix.
    ///
    /// For [`TaskError::Source`] the full cause chain is kept.
    ///
    /// ```
    /// use worklane::TaskError;
    ///
    /// let err = TaskError::from(anyhow::anyhow!("bad header").context("cannot decode track.flac"));
    /// assert_eq!(err.as_message(), "cannot decode track.flac: bad header");
    /// ```
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => error.clone(),
            TaskError::Source(e) => format!("{e:#}"),
            TaskError::Panicked { info } => info.clone(),
            TaskError::Canceled => "task cancelled".to_string(),
        }
    }

    /// True for [`TaskError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_message_is_verbatim() {
        let err = TaskError::fail("vocal model missing: /models/sep.onnx");
        assert_eq!(err.as_message(), "vocal model missing: /models/sep.onnx");
        assert_eq!(
            err.to_string(),
            "execution failed: vocal model missing: /models/sep.onnx"
        );
    }

    #[test]
    fn test_source_keeps_cause_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: TaskError = anyhow::Error::new(inner).context("open a.wav").into();
        assert_eq!(err.as_label(), "task_failed");
        assert_eq!(err.as_message(), "open a.wav: no such file");
    }

    #[test]
    fn test_canceled_label() {
        assert!(TaskError::Canceled.is_canceled());
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
        assert!(!TaskError::fail("x").is_canceled());
    }
}
