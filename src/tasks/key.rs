//! # Task identity.
//!
//! [`TaskKey`] is what the dedup guard compares: two submissions with the
//! same key in the same lane describe the same logical unit of work.

use std::fmt;
use std::sync::Arc;

/// Identity of a task: the entity it targets plus the kind of work.
///
/// ```
/// use worklane::TaskKey;
///
/// let key = TaskKey::new("preview", "tracks/intro.flac");
/// assert_eq!(key.kind(), "preview");
/// assert_eq!(key.target(), "tracks/intro.flac");
/// assert_eq!(key.to_string(), "preview:tracks/intro.flac");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaskKey {
    kind: Arc<str>,
    target: Arc<str>,
}

impl TaskKey {
    /// Creates a key for `kind` of work on `target`.
    pub fn new(kind: impl Into<Arc<str>>, target: impl Into<Arc<str>>) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
        }
    }

    /// Kind of work (e.g. `analyze`, `preview`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Identity of the domain entity the task operates on.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Shared handle to the target, used as the status table key.
    pub(crate) fn target_arc(&self) -> Arc<str> {
        Arc::clone(&self.target)
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.target)
    }
}
