//! # Async subscriber trait
//!
//! `Subscribe` is the extension point for observers that are not tied to the
//! owning context: logging, metrics, audit trails. Each subscriber is driven
//! by a dedicated worker loop fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! Listeners that must mutate state owned by the interactive context use
//! [`Listener`](crate::Listener) instead; those run synchronously on that context.
//!
//! ## Contract
//! - Implementations may be slow; they do **not** block the scheduler nor
//!   other subscribers.
//! - If a subscriber's queue overflows, events for that subscriber are
//!   **dropped** and a `SubscriberOverflow` event is published.

use crate::events::Event;
use async_trait::async_trait;

/// Contract for async event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
