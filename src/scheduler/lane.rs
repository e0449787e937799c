//! # Lane bookkeeping.
//!
//! A lane is a FIFO of pending entries plus one running slot. All methods
//! run on the owning context; nothing here is shared across threads.

use std::collections::VecDeque;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::listeners::Listener;
use crate::tasks::{Lane, TaskId, TaskKey, TaskMeta, TaskRef, TaskState};

/// A submitted task together with its per-submission listener.
pub(super) struct Entry<O> {
    pub meta: TaskMeta,
    pub task: TaskRef<O>,
    pub listener: Option<Box<dyn Listener<O>>>,
    pub state: TaskState,
}

impl<O> Entry<O> {
    pub fn new(meta: TaskMeta, task: TaskRef<O>, listener: Option<Box<dyn Listener<O>>>) -> Self {
        Self {
            meta,
            task,
            listener,
            state: TaskState::Queued,
        }
    }
}

/// The entry occupying a lane's running slot.
pub(super) struct Running<O> {
    pub entry: Entry<O>,
    /// Token handed to the task; cancelling it is the cooperative stop signal.
    pub cancel: CancellationToken,
    pub join: JoinHandle<()>,
    pub started_at: Instant,
    pub cancel_requested: bool,
}

impl<O> Running<O> {
    /// Signals cooperative cancellation. Returns false if already signalled.
    pub fn request_cancel(&mut self) -> bool {
        if self.cancel_requested {
            return false;
        }
        self.cancel_requested = true;
        self.cancel.cancel();
        true
    }
}

/// State of a single lane.
pub(super) struct LaneState<O> {
    pub lane: Lane,
    pub pending: VecDeque<Entry<O>>,
    pub running: Option<Running<O>>,
}

impl<O> LaneState<O> {
    /// Creates a new idle lane.
    pub fn new(lane: Lane) -> Self {
        Self {
            lane,
            pending: VecDeque::new(),
            running: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.running.is_none()
    }

    pub fn running_id(&self) -> Option<TaskId> {
        self.running.as_ref().map(|r| r.entry.meta.id)
    }

    /// Position of the first pending entry with `key`.
    pub fn pending_position(&self, key: &TaskKey) -> Option<usize> {
        self.pending.iter().position(|e| &e.meta.key == key)
    }

    /// Whether the running task has `key` and has not been asked to stop.
    pub fn running_matches(&self, key: &TaskKey) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.cancel_requested && &r.entry.meta.key == key)
    }

    /// Occupies the running slot.
    ///
    /// # Panics
    /// If the slot is already taken: two running tasks in one lane would
    /// break the concurrency bound.
    pub fn set_running(&mut self, running: Running<O>) {
        if let Some(current) = &self.running {
            panic!(
                "{} lane already runs {} ({}); refusing to start {}",
                self.lane, current.entry.meta.id, current.entry.meta.key, running.entry.meta.id
            );
        }
        self.running = Some(running);
    }

    /// Frees the running slot for the task that just completed.
    ///
    /// # Panics
    /// If the slot is empty or holds a different task.
    pub fn take_running(&mut self, id: TaskId) -> Running<O> {
        match self.running.take() {
            Some(running) if running.entry.meta.id == id => running,
            other => panic!(
                "completion for {id} in {} lane, but slot holds {:?}",
                self.lane,
                other.as_ref().map(|r| r.entry.meta.id)
            ),
        }
    }

    /// Removes every pending entry whose meta matches `pred`, in FIFO order.
    pub fn remove_pending(&mut self, mut pred: impl FnMut(&TaskMeta) -> bool) -> Vec<Entry<O>> {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.pending.len());
        for entry in self.pending.drain(..) {
            if pred(&entry.meta) {
                removed.push(entry);
            } else {
                kept.push_back(entry);
            }
        }
        self.pending = kept;
        removed
    }

    pub fn state_of(&self, id: TaskId) -> Option<TaskState> {
        if let Some(r) = self.running.as_ref().filter(|r| r.entry.meta.id == id) {
            return Some(r.entry.state);
        }
        self.pending
            .iter()
            .find(|e| e.meta.id == id)
            .map(|e| e.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::TaskFn;

    fn entry(id: u64, target: &str) -> Entry<i32> {
        let key = TaskKey::new("analyze", target);
        let task: TaskRef<i32> = TaskFn::arc(key.clone(), Lane::Standard, |_ctx: CancellationToken| async {
            Ok::<i32, TaskError>(0)
        });
        let meta = TaskMeta {
            id: TaskId(id),
            key,
            lane: Lane::Standard,
        };
        Entry::new(meta, task, None)
    }

    fn running(id: u64, target: &str) -> Running<i32> {
        Running {
            entry: entry(id, target),
            cancel: CancellationToken::new(),
            join: tokio::spawn(async {}),
            started_at: Instant::now(),
            cancel_requested: false,
        }
    }

    #[tokio::test]
    async fn test_take_running_frees_slot() {
        let mut lane = LaneState::new(Lane::Standard);
        lane.set_running(running(1, "a"));
        assert_eq!(lane.running_id(), Some(TaskId(1)));

        let done = lane.take_running(TaskId(1));
        assert_eq!(done.entry.meta.id, TaskId(1));
        assert!(lane.is_free());
    }

    #[tokio::test]
    #[should_panic(expected = "lane already runs")]
    async fn test_second_running_task_panics() {
        let mut lane = LaneState::new(Lane::Standard);
        lane.set_running(running(1, "a"));
        lane.set_running(running(2, "b"));
    }

    #[tokio::test]
    #[should_panic(expected = "but slot holds")]
    async fn test_completion_for_other_task_panics() {
        let mut lane = LaneState::new(Lane::Standard);
        lane.set_running(running(1, "a"));
        lane.take_running(TaskId(2));
    }

    #[test]
    #[should_panic(expected = "but slot holds None")]
    fn test_completion_on_empty_slot_panics() {
        let mut lane = LaneState::<i32>::new(Lane::Instant);
        lane.take_running(TaskId(1));
    }

    #[test]
    fn test_remove_pending_keeps_fifo_order() {
        let mut lane = LaneState::new(Lane::Standard);
        for (id, target) in [(1, "a"), (2, "b"), (3, "a"), (4, "c")] {
            lane.pending.push_back(entry(id, target));
        }

        let removed = lane.remove_pending(|meta| meta.key.target() == "a");
        let removed: Vec<TaskId> = removed.iter().map(|e| e.meta.id).collect();
        assert_eq!(removed, vec![TaskId(1), TaskId(3)]);

        let kept: Vec<TaskId> = lane.pending.iter().map(|e| e.meta.id).collect();
        assert_eq!(kept, vec![TaskId(2), TaskId(4)]);
        assert_eq!(lane.pending_position(&TaskKey::new("analyze", "c")), Some(1));
    }
}
