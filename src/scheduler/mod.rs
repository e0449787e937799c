//! # Dual-lane scheduling.
//!
//! - [`Scheduler`] owns both lanes and runs on a single context
//! - [`SchedulerBuilder`] wires subscribers and initial listeners
//! - [`SchedulerHandle`] submits from other threads through a bounded queue
//! - [`DedupPolicy`] / [`Admission`] describe what happens to a submission
//! - [`SchedulerSnapshot`] is a read-only view for UI reflection

mod admission;
mod builder;
mod core;
mod error;
mod handle;
mod lane;
mod snapshot;

pub use admission::{Admission, DedupPolicy};
pub use builder::SchedulerBuilder;
pub use self::core::Scheduler;
pub use error::SubmitError;
pub use handle::SchedulerHandle;
pub use snapshot::{LaneSnapshot, SchedulerSnapshot};
