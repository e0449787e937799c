//! # LogWriter: `tracing` event logger
//!
//! A minimal subscriber that forwards every [`Event`] to `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO worklane: queued task="analyze:a.flac" lane=standard id=#1
//! INFO worklane: started task="analyze:a.flac" lane=standard id=#1
//! WARN worklane: failed task="analyze:a.flac" lane=standard id=#1 err="decoder error"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let lane = e.lane.map(|l| l.as_str()).unwrap_or("-");
        let id = e.id.map(|id| id.to_string()).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::TaskQueued => tracing::info!(task, lane, id = %id, "queued"),
            EventKind::TaskStarted => tracing::info!(task, lane, id = %id, "started"),
            EventKind::TaskFinished => tracing::info!(task, lane, id = %id, "finished"),
            EventKind::TaskFailed => tracing::warn!(task, lane, id = %id, err = reason, "failed"),
            EventKind::TaskCancelled => tracing::info!(task, lane, id = %id, reason, "cancelled"),
            EventKind::DuplicateDropped => {
                tracing::debug!(task, lane, existing = %id, "duplicate dropped")
            }
            EventKind::TaskReplaced => tracing::debug!(task, lane, replaced = %id, "replaced"),
            EventKind::CancelRequested => tracing::info!(task, lane, id = %id, "cancel requested"),
            EventKind::ShutdownRequested => tracing::info!("shutdown requested"),
            EventKind::AllStoppedWithin => tracing::info!("all tasks stopped within grace"),
            EventKind::GraceExceeded => tracing::warn!("grace exceeded"),
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = task, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = task, info = reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
