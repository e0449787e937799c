//! # worklane
//!
//! **Worklane** is a dual-lane task scheduler for interactive applications.
//!
//! Heavy work (analysis, separation, indexing) runs strictly one at a time in
//! the **standard** lane. Light, user-triggered work (previews, metadata reads)
//! runs in the **instant** lane, which never waits behind standard work. Each
//! lane has one running slot, so at most two tasks execute at any moment.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌─────────────────┐
//!     │   TaskFn /   │   │   TaskFn /   │   │ SchedulerHandle │
//!     │  impl Task   │   │  impl Task   │   │ (other threads) │
//!     └──────┬───────┘   └──────┬───────┘   └────────┬────────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler (owned by one context, &mut self, no locks)            │
//! │  - dedup guard (DedupPolicy per task)                             │
//! │  - standard lane: pending FIFO + 1 slot                           │
//! │  - instant lane:  pending FIFO + 1 slot                           │
//! └──────┬────────────────────────────────────────────┬───────────────┘
//!        │ tokio::spawn(task.run(child token))        │ publish(Event)
//!        ▼                                            ▼
//!  [completion queue] ──► turn() / poll_completions() Bus ──► SubscriberSet
//!                              │                              (LogWriter, ...)
//!                              ├─► per-submission Listener
//!                              ├─► global Listeners (StatusMapper, Callbacks)
//!                              └─► promote next pending task of that lane
//! ```
//!
//! ### Lifecycle
//! ```text
//! submit(task, run_immediately)
//!   ├─ duplicate key in lane? ─► DedupPolicy (DropNew / Replace / AllowOverlap)
//!   ├─ on_queued
//!   ├─ slot free ─► Running ─► on_started
//!   └─ slot busy ─► pending FIFO
//!
//! completion
//!   ├─ Ok(output)            ─► Finished  ─► on_completed(meta, &output)
//!   ├─ Err(error)            ─► Failed    ─► on_error(meta, &error)   (never retried)
//!   └─ cancel requested      ─► Cancelled ─► on_cancelled(meta)
//!   then promote the lane's next pending task
//! ```
//!
//! ## Example
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tokio_util::sync::CancellationToken;
//! use worklane::{Callbacks, Lane, Scheduler, SchedulerConfig, TaskError, TaskFn, TaskKey};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut sched = Scheduler::<String>::new(SchedulerConfig::default());
//!
//!     let analyze = TaskFn::arc(
//!         TaskKey::new("analyze", "tracks/intro.flac"),
//!         Lane::Standard,
//!         |ctx: CancellationToken| async move {
//!             if ctx.is_cancelled() {
//!                 return Err(TaskError::Canceled);
//!             }
//!             Ok("bpm=124".to_string())
//!         },
//!     );
//!     let preview = TaskFn::arc(
//!         TaskKey::new("preview", "tracks/intro.flac"),
//!         Lane::Instant,
//!         |_ctx: CancellationToken| async { Ok::<_, TaskError>("waveform".to_string()) },
//!     );
//!
//!     let done = Rc::new(RefCell::new(Vec::new()));
//!     let seen = Rc::clone(&done);
//!     sched.on_completed(move |meta, out| seen.borrow_mut().push(format!("{}={out}", meta.key)));
//!
//!     sched.submit(analyze, true);
//!     sched.submit_with(
//!         preview,
//!         true,
//!         Callbacks::new().on_started(|meta| println!("preview started: {}", meta.id)),
//!     );
//!     assert_eq!(sched.running_total(), 2);
//!
//!     sched.run_until_idle().await;
//!     assert_eq!(done.borrow().len(), 2);
//! }
//! ```
mod config;
mod error;
mod events;
mod listeners;
mod scheduler;
mod status;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::SchedulerConfig;
pub use error::{RuntimeError, TaskError};
pub use events::{Event, EventKind};
pub use listeners::{Callbacks, Listener};
pub use scheduler::{
    Admission, DedupPolicy, LaneSnapshot, Scheduler, SchedulerBuilder, SchedulerHandle,
    SchedulerSnapshot, SubmitError,
};
pub use status::{ResultStatus, Status, StatusMapper, StatusSource};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{Lane, Outcome, Task, TaskFn, TaskId, TaskKey, TaskMeta, TaskRef, TaskState};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
