//! # Scheduler events.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: queued, started, finished, failed, cancelled
//! - **Admission events**: duplicate dropped, replaced, cancel requested
//! - **Runtime events**: subscriber overflow/panic, shutdown progress
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use worklane::{Event, EventKind, Lane, TaskKey};
//!
//! let key = TaskKey::new("analyze", "tracks/b.flac");
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task(key.to_string())
//!     .with_lane(Lane::Standard)
//!     .with_reason("decoder error");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("analyze:tracks/b.flac"));
//! assert_eq!(ev.reason.as_deref(), Some("decoder error"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::tasks::{Lane, TaskId, TaskMeta};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of scheduler events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `task` (subscriber name) and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `task` (subscriber name), `reason` (dropped kind and seq) and the
    /// dropped event's `id` and `lane`.
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested; pending work is being cancelled.
    ShutdownRequested,

    /// All running tasks stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; remaining tasks were aborted.
    GraceExceeded,

    // === Task lifecycle events ===
    /// Task accepted into its lane.
    TaskQueued,

    /// Task promoted to its lane's running slot.
    TaskStarted,

    /// Task returned a value.
    TaskFinished,

    /// Task returned an error. `reason` carries the full error message.
    TaskFailed,

    /// Task reached `Cancelled`. `reason` is `pending` or `running`.
    TaskCancelled,

    // === Admission events ===
    /// Submission dropped because a task with the same key is in flight.
    ///
    /// `id` is the existing task's id.
    DuplicateDropped,

    /// Pending task replaced in place by a newer submission with the same key.
    ///
    /// `id` is the replaced task's id.
    TaskReplaced,

    /// Cooperative cancellation signalled to a running task.
    CancelRequested,
}

/// Scheduler event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Task key (`kind:target`) or subscriber name.
    pub task: Option<Arc<str>>,
    /// Submission id, if the event concerns a task.
    pub id: Option<TaskId>,
    /// Lane of the task.
    pub lane: Option<Lane>,
    /// Human-readable reason (error message, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            id: None,
            lane: None,
            reason: None,
        }
    }

    /// Creates an event describing the task in `meta`.
    pub fn for_task(kind: EventKind, meta: &TaskMeta) -> Self {
        Event::new(kind)
            .with_task(meta.key.to_string())
            .with_id(meta.id)
            .with_lane(meta.lane)
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task key or subscriber name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a submission id.
    #[inline]
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attaches a lane.
    #[inline]
    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane);
        self
    }

    /// Reports that `subscriber` missed `dropped` because its queue was `cause`.
    ///
    /// Carries the dropped event's id and lane so a lost lifecycle step can be
    /// traced back to its task.
    pub fn subscriber_overflow(subscriber: &'static str, dropped: &Event, cause: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("dropped {:?} seq={}: queue {cause}", dropped.kind, dropped.seq));
        ev.id = dropped.id;
        ev.lane = dropped.lane;
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for events the subscriber set itself publishes.
    #[inline]
    pub fn is_subscriber_report(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskKey;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::TaskQueued);
        let b = Event::new(EventKind::TaskStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_for_task_fills_identity() {
        let meta = TaskMeta {
            id: TaskId(7),
            key: TaskKey::new("preview", "x.wav"),
            lane: Lane::Instant,
        };
        let ev = Event::for_task(EventKind::TaskStarted, &meta);
        assert_eq!(ev.task.as_deref(), Some("preview:x.wav"));
        assert_eq!(ev.id, Some(TaskId(7)));
        assert_eq!(ev.lane, Some(Lane::Instant));
        assert!(ev.reason.is_none());
    }

    #[test]
    fn test_overflow_names_dropped_event() {
        let meta = TaskMeta {
            id: TaskId(3),
            key: TaskKey::new("analyze", "y.flac"),
            lane: Lane::Standard,
        };
        let lost = Event::for_task(EventKind::TaskFinished, &meta);
        let ev = Event::subscriber_overflow("audit", &lost, "full");

        assert!(ev.is_subscriber_report());
        assert_eq!(ev.task.as_deref(), Some("audit"));
        assert_eq!(ev.id, Some(TaskId(3)));
        assert_eq!(ev.lane, Some(Lane::Standard));
        assert_eq!(
            ev.reason.as_deref(),
            Some(format!("dropped TaskFinished seq={}: queue full", lost.seq).as_str())
        );
        assert!(!lost.is_subscriber_report());
    }
}
