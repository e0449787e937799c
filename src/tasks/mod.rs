//! # Task abstractions.
//!
//! - [`Task`] - trait for async cancelable units of work
//! - [`TaskFn`] - closure-backed implementation
//! - [`TaskRef`] - shared handle (`Arc<dyn Task<Output = O>>`)
//! - [`TaskKey`], [`Lane`] - identity and classification
//! - [`TaskId`], [`TaskState`], [`TaskMeta`], [`Outcome`] - scheduler bookkeeping

mod key;
mod lane;
mod meta;
mod task;
mod task_fn;

pub use key::TaskKey;
pub use lane::Lane;
pub use meta::{Outcome, TaskId, TaskMeta, TaskState};
pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
