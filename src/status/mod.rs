//! # Domain status with a single writer per entity.
//!
//! - [`Status`] - workflow statuses (`Queued`, `Processing`) and result statuses
//! - [`StatusSource`] - how a finished task's output names its result status
//! - [`StatusMapper`] - keeps one status per target and lets only the owning
//!   standard task write it
//!
//! ```text
//! on_queued(std #7)    ──► claim target for #7, remember prior status, Queued
//! on_started(std #7)   ──► Processing                       (owner only)
//! on_completed(std #7) ──► output.result_status(), release  (owner only)
//! on_error(std #7)     ──► Error(message), release          (owner only)
//! on_cancelled(std #7) ──► restore prior status, release    (owner only)
//! instant tasks        ──► ignored by the listener; direct writes panic
//! ```

mod mapper;
mod types;

pub use mapper::StatusMapper;
pub use types::{ResultStatus, Status, StatusSource};
