//! # Async event subscribers.
//!
//! ```text
//! Scheduler ── publish(Event) ──► Bus ──► fan-out listener ──► SubscriberSet
//!                                                      ┌─────────┼─────────┐
//!                                                      ▼         ▼         ▼
//!                                                  LogWriter  Metrics   Custom
//! ```
//!
//! Subscribers observe; they never affect scheduling. For callbacks that run
//! on the owning context see [`crate::listeners`].

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
