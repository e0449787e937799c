use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    config::SchedulerConfig,
    events::Bus,
    listeners::Listener,
    subscribers::{Subscribe, SubscriberSet},
};

use super::core::Scheduler;

/// Builder for constructing a [`Scheduler`] with optional features.
pub struct SchedulerBuilder<O> {
    cfg: SchedulerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    listeners: Vec<Box<dyn Listener<O>>>,
}

impl<O: Send + 'static> SchedulerBuilder<O> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SchedulerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive scheduler events through dedicated workers with
    /// bounded queues. They never see task outputs.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a global listener.
    pub fn with_listener(mut self, listener: impl Listener<O> + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Builds the scheduler.
    ///
    /// With subscribers configured this spawns the fan-out listener, so it
    /// must be called inside a Tokio runtime.
    pub fn build(self) -> Scheduler<O> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let fanout_token = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            subscriber_listener(&bus, set, fanout_token.clone());
        }
        Scheduler::from_parts(self.cfg, bus, self.listeners, fanout_token)
    }
}

/// Forwards bus events to the subscriber set until the scheduler is dropped.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber fan-out lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        set.shutdown().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::events::{Event, EventKind};
    use crate::tasks::{Lane, TaskFn, TaskKey};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        seen: Arc<Mutex<Vec<EventKind>>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_lifecycle_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sched = SchedulerBuilder::<u8>::new(SchedulerConfig::default())
            .with_subscribers(vec![Arc::new(Recorder { seen: seen.clone() })])
            .build();

        sched.submit(
            TaskFn::arc(
                TaskKey::new("preview", "a"),
                Lane::Instant,
                |_ctx: CancellationToken| async { Ok::<u8, TaskError>(1) },
            ),
            true,
        );
        sched.run_until_idle().await;

        for _ in 0..100 {
            if seen.lock().unwrap().len() >= 3 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::TaskQueued, EventKind::TaskStarted, EventKind::TaskFinished]
        );
    }

    #[tokio::test]
    async fn test_builder_listener_is_global() {
        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        let c = count.clone();
        let mut sched = SchedulerBuilder::<u8>::new(SchedulerConfig::default())
            .with_listener(crate::listeners::Callbacks::new().on_started(move |_| c.set(c.get() + 1)))
            .build();

        for target in ["a", "b"] {
            sched.submit(
                TaskFn::arc(
                    TaskKey::new("scan", target),
                    Lane::Standard,
                    |_ctx: CancellationToken| async { Ok::<u8, TaskError>(0) },
                ),
                true,
            );
        }
        sched.run_until_idle().await;
        assert_eq!(count.get(), 2);
    }
}
