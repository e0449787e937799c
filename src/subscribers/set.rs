//! # Non-blocking event fan-out to multiple subscribers.
//!
//! ```text
//! emit(event)
//!     │
//!     ├──► [outlet 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)          └──────► panic → SubscriberPanicked
//!     └──► [outlet N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! `emit()` never waits. A subscriber whose outlet is full or closed misses
//! the event, and a `SubscriberOverflow` naming the dropped event (kind, seq,
//! task id and lane) goes back on the bus. Reports about subscribers are
//! themselves never re-reported. Each subscriber sees events in bus order.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Sending half of one subscriber's queue.
struct Outlet {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for async event subscribers.
pub struct SubscriberSet {
    outlets: Vec<Outlet>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut outlets = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            outlets.push(Outlet {
                name: sub.name(),
                tx,
            });
            workers.push(spawn_worker(sub, rx, bus.clone()));
        }
        Self {
            outlets,
            workers,
            bus,
        }
    }

    /// Number of subscribers in the set.
    pub fn len(&self) -> usize {
        self.outlets.len()
    }

    /// True if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.outlets.is_empty()
    }

    /// Queues `event` for every subscriber without waiting.
    pub fn emit(&self, event: Event) {
        let event = Arc::new(event);
        for outlet in &self.outlets {
            let cause = match outlet.tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if event.is_subscriber_report() {
                continue;
            }
            tracing::warn!(
                subscriber = outlet.name,
                kind = ?event.kind,
                seq = event.seq,
                task = event.task.as_deref(),
                cause,
                "subscriber missed event"
            );
            self.bus
                .publish(Event::subscriber_overflow(outlet.name, &event, cause));
        }
    }

    /// Closes every outlet, then waits until workers have handled what was queued.
    pub async fn shutdown(self) {
        drop(self.outlets);
        for worker in self.workers {
            if let Err(err) = worker.await {
                tracing::warn!(error = %err, "subscriber worker did not finish");
            }
        }
    }
}

/// Runs `sub` over its queue until the outlet closes, reporting panics on `bus`.
fn spawn_worker(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    bus: Bus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
                .catch_unwind()
                .await;
            if let Err(payload) = handled {
                let info = crate::panic_message(&*payload);
                tracing::error!(subscriber = sub.name(), kind = ?ev.kind, %info, "subscriber panicked");
                bus.publish(Event::subscriber_panicked(sub.name(), info));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::tasks::{Lane, TaskId, TaskKey, TaskMeta};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        seen: Arc<Mutex<Vec<EventKind>>>,
        capacity: usize,
    }

    impl Recorder {
        fn new(seen: &Arc<Mutex<Vec<EventKind>>>, capacity: usize) -> Arc<Self> {
            Arc::new(Self {
                seen: Arc::clone(seen),
                capacity,
            })
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }

        fn queue_capacity(&self) -> usize {
            self.capacity
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[tokio::test]
    async fn test_fan_out_keeps_order_per_subscriber() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new(
            vec![Recorder::new(&seen, 16)],
            Bus::new(16),
        );
        assert_eq!(set.len(), 1);

        set.emit(Event::new(EventKind::TaskQueued));
        set.emit(Event::new(EventKind::TaskStarted));
        set.emit(Event::new(EventKind::TaskFinished));
        set.shutdown().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                EventKind::TaskQueued,
                EventKind::TaskStarted,
                EventKind::TaskFinished
            ]
        );
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_reported() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Exploder)], bus);

        set.emit(Event::new(EventKind::TaskQueued));
        set.shutdown().await;

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.task.as_deref(), Some("exploder"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_full_outlet_reports_dropped_events() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new(vec![Recorder::new(&seen, 1)], bus);

        let meta = |id| TaskMeta {
            id: TaskId(id),
            key: TaskKey::new("analyze", "a"),
            lane: Lane::Standard,
        };
        // Workers have not run yet: only the first event fits.
        set.emit(Event::for_task(EventKind::TaskQueued, &meta(1)));
        set.emit(Event::for_task(EventKind::TaskStarted, &meta(1)));
        set.emit(Event::for_task(EventKind::TaskQueued, &meta(2)));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::SubscriberOverflow);
        assert_eq!(first.task.as_deref(), Some("recorder"));
        assert_eq!(first.id, Some(TaskId(1)));
        assert!(first.reason.as_deref().unwrap().starts_with("dropped TaskStarted"));
        assert_eq!(second.id, Some(TaskId(2)));

        set.shutdown().await;
        assert_eq!(*seen.lock().unwrap(), vec![EventKind::TaskQueued]);
    }

    #[tokio::test]
    async fn test_subscriber_reports_are_not_re_reported() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new(vec![Recorder::new(&seen, 1)], bus);

        set.emit(Event::new(EventKind::TaskQueued));
        set.emit(Event::subscriber_panicked("other", "boom".to_string()));
        set.shutdown().await;

        assert!(rx.try_recv().is_err());
        assert_eq!(*seen.lock().unwrap(), vec![EventKind::TaskQueued]);
    }
}
