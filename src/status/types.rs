use std::fmt;
use std::sync::Arc;

/// Status of a domain entity (a processed item).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Status {
    /// Nothing scheduled and no result yet.
    #[default]
    Idle,
    /// A standard task for the entity is waiting in its lane.
    Queued,
    /// A standard task for the entity is running.
    Processing,
    Match,
    Mismatch,
    Updated,
    Resolved,
    /// Last standard task failed; carries the exact error message.
    Error(Arc<str>),
}

impl Status {
    /// Statuses produced only from a finished or failed standard task.
    pub fn is_result(&self) -> bool {
        matches!(
            self,
            Status::Match | Status::Mismatch | Status::Updated | Status::Resolved | Status::Error(_)
        )
    }

    /// Transient statuses set by submission and start.
    pub fn is_workflow(&self) -> bool {
        matches!(self, Status::Queued | Status::Processing)
    }

    /// Stable lowercase name, without the error message.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Queued => "queued",
            Status::Processing => "processing",
            Status::Match => "match",
            Status::Mismatch => "mismatch",
            Status::Updated => "updated",
            Status::Resolved => "resolved",
            Status::Error(_) => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Error(msg) => write!(f, "error: {msg}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Result statuses a successful standard task may report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultStatus {
    Match,
    Mismatch,
    Updated,
    Resolved,
}

impl From<ResultStatus> for Status {
    fn from(r: ResultStatus) -> Self {
        match r {
            ResultStatus::Match => Status::Match,
            ResultStatus::Mismatch => Status::Mismatch,
            ResultStatus::Updated => Status::Updated,
            ResultStatus::Resolved => Status::Resolved,
        }
    }
}

/// Task output that carries the sub-result a status is mapped from.
///
/// `None` means the task produced nothing status-relevant; the entity goes
/// back to whatever status it had before the task was queued.
pub trait StatusSource {
    fn result_status(&self) -> Option<ResultStatus>;
}

impl StatusSource for ResultStatus {
    fn result_status(&self) -> Option<ResultStatus> {
        Some(*self)
    }
}

impl<T: StatusSource> StatusSource for Option<T> {
    fn result_status(&self) -> Option<ResultStatus> {
        self.as_ref().and_then(StatusSource::result_status)
    }
}
