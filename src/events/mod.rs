//! Scheduler events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler` (every lifecycle and admission decision),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the fan-out listener spawned by the scheduler builder
//!   (feeds `SubscriberSet`) and receivers from `Scheduler::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
