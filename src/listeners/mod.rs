//! # Owner-context notifications.
//!
//! - [`Listener`] - synchronous lifecycle callbacks, delivered on the context
//!   that owns the scheduler
//! - [`Callbacks`] - closure-backed listener
//!
//! Listeners are registered per submission
//! ([`Scheduler::submit_with`](crate::Scheduler::submit_with)) or globally
//! ([`Scheduler::add_listener`](crate::Scheduler::add_listener),
//! [`Scheduler::on_completed`](crate::Scheduler::on_completed), ...).

mod callbacks;
mod listener;

pub use callbacks::Callbacks;
pub use listener::Listener;
