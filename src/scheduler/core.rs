//! # Scheduler: two lanes, one running slot each.
//!
//! ## Architecture
//! ```text
//!  submit(task, run_immediately) ─┐        SchedulerHandle::submit ──► [command queue]
//!                                 ▼                                          │
//!                           dedup guard ◄────────────────────────────────────┘
//!                                 │
//!              ┌──────────────────┴──────────────────┐
//!              ▼                                     ▼
//!   standard: [pending FIFO] → (slot)     instant: [pending FIFO] → (slot)
//!                                 │                  │
//!                       tokio::spawn(task.run(child token))
//!                                 │                  │
//!                                 └───► [completion queue] ──► turn() / poll_completions()
//!                                                                  │
//!                                    per-submission listener ◄─────┤
//!                                    global listeners        ◄─────┤
//!                                    Bus (events)            ◄─────┤
//!                                    promote next pending    ◄─────┘
//! ```
//!
//! ## Rules
//! - All bookkeeping is `&mut self`: the scheduler lives on one context and
//!   needs no locks. Tasks execute elsewhere; their outcome comes back over
//!   the bounded completion channel.
//! - Each lane runs at most one task; at most two run in total.
//! - Pending tasks start in strict arrival order per lane.
//! - Listeners run on the owning context, inside `submit`, `cancel`, `turn`
//!   and `poll_completions`.
//! - A failed task is not retried; the lane moves on.

use std::future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{LANE_SLOTS, SchedulerConfig},
    error::{RuntimeError, TaskError},
    events::{Bus, Event, EventKind},
    listeners::{Callbacks, Listener},
    tasks::{Lane, Outcome, TaskId, TaskKey, TaskMeta, TaskRef, TaskState},
};

use super::{
    admission::{Admission, DedupPolicy},
    builder::SchedulerBuilder,
    handle::{Command, SchedulerHandle},
    lane::{Entry, LaneState, Running},
    snapshot::{LaneSnapshot, SchedulerSnapshot},
};

/// Outcome of one execution, sent back by the spawned task.
pub(super) struct Completion<O> {
    id: TaskId,
    lane: Lane,
    result: Result<O, TaskError>,
}

/// Command queue state; exists while at least one handle may still send.
struct Commands<O> {
    tx: mpsc::WeakSender<Command<O>>,
    rx: mpsc::Receiver<Command<O>>,
}

/// What woke up [`Scheduler::turn`].
enum Wake<O> {
    Done(Completion<O>),
    Command(Option<Command<O>>),
}

/// Dual-lane task scheduler.
///
/// Create one per application context, keep it on that context, and drive it
/// with [`turn`](Scheduler::turn) (or [`poll_completions`](Scheduler::poll_completions)
/// from an existing run loop). Must be created and driven inside a Tokio runtime.
///
/// Dropping the scheduler cancels every running task's token; use
/// [`shutdown`](Scheduler::shutdown) to also wait for them.
pub struct Scheduler<O> {
    cfg: SchedulerConfig,
    lanes: [LaneState<O>; LANE_SLOTS],
    next_id: u64,
    listeners: Vec<Box<dyn Listener<O>>>,
    bus: Bus,
    runtime_token: CancellationToken,
    fanout_token: CancellationToken,
    done_tx: mpsc::Sender<Completion<O>>,
    done_rx: mpsc::Receiver<Completion<O>>,
    commands: Option<Commands<O>>,
}

impl<O: Send + 'static> Scheduler<O> {
    /// Creates a scheduler without async subscribers.
    pub fn new(cfg: SchedulerConfig) -> Self {
        SchedulerBuilder::new(cfg).build()
    }

    /// Starts a builder (subscribers, initial listeners).
    pub fn builder(cfg: SchedulerConfig) -> SchedulerBuilder<O> {
        SchedulerBuilder::new(cfg)
    }

    pub(super) fn from_parts(
        cfg: SchedulerConfig,
        bus: Bus,
        listeners: Vec<Box<dyn Listener<O>>>,
        fanout_token: CancellationToken,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::channel(cfg.completion_capacity_clamped());
        Self {
            cfg,
            lanes: [
                LaneState::new(Lane::Standard),
                LaneState::new(Lane::Instant),
            ],
            next_id: 0,
            listeners,
            bus,
            runtime_token: CancellationToken::new(),
            fanout_token,
            done_tx,
            done_rx,
            commands: None,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    /// Receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Registers a global listener, called for every task after its own listener.
    pub fn add_listener(&mut self, listener: impl Listener<O> + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Registers a global `on_started` callback.
    pub fn on_started(&mut self, f: impl FnMut(&TaskMeta) + 'static) {
        self.add_listener(Callbacks::new().on_started(f));
    }

    /// Registers a global `on_completed` callback.
    pub fn on_completed(&mut self, f: impl FnMut(&TaskMeta, &O) + 'static) {
        self.add_listener(Callbacks::new().on_completed(f));
    }

    /// Registers a global `on_error` callback.
    pub fn on_error(&mut self, f: impl FnMut(&TaskMeta, &TaskError) + 'static) {
        self.add_listener(Callbacks::new().on_error(f));
    }

    /// Returns a `Send` handle for submitting from other threads.
    pub fn handle(&mut self) -> SchedulerHandle<O> {
        if let Some(tx) = self.commands.as_ref().and_then(|c| c.tx.upgrade()) {
            return SchedulerHandle { tx };
        }
        // Every previous handle is gone; apply what they left behind first.
        if let Some(mut old) = self.commands.take() {
            while let Ok(cmd) = old.rx.try_recv() {
                self.apply(cmd);
            }
        }
        let (tx, rx) = mpsc::channel(self.cfg.command_capacity_clamped());
        self.commands = Some(Commands {
            tx: tx.downgrade(),
            rx,
        });
        SchedulerHandle { tx }
    }

    // ---------------------------
    // Submission
    // ---------------------------

    /// Submits a task to the lane matching its classification.
    ///
    /// - `run_immediately` with a free slot: the task starts within this call.
    /// - busy slot: the task waits at the tail of the lane's FIFO.
    /// - `run_immediately = false`: the task is appended at the tail; an idle
    ///   lane still picks it up right away through the normal advancement rule.
    ///
    /// A task whose key is already in flight in the same lane is handled per
    /// its [`DedupPolicy`].
    pub fn submit(&mut self, task: TaskRef<O>, run_immediately: bool) -> Admission {
        self.admit(task, run_immediately, None)
    }

    /// Like [`submit`](Scheduler::submit), with a listener for this task only.
    ///
    /// The listener is dropped without any call if the submission is a duplicate.
    pub fn submit_with(
        &mut self,
        task: TaskRef<O>,
        run_immediately: bool,
        listener: impl Listener<O> + 'static,
    ) -> Admission {
        self.admit(task, run_immediately, Some(Box::new(listener)))
    }

    fn admit(
        &mut self,
        task: TaskRef<O>,
        run_immediately: bool,
        listener: Option<Box<dyn Listener<O>>>,
    ) -> Admission {
        let lane = task.lane();
        let key = task.key().clone();
        let slot = &self.lanes[lane.index()];
        let pending_dup = slot.pending_position(&key);
        let running_dup = slot.running_matches(&key);

        match task.dedup() {
            DedupPolicy::AllowOverlap => {}
            DedupPolicy::DropNew => {
                let existing = if running_dup {
                    slot.running_id()
                } else {
                    pending_dup.map(|pos| slot.pending[pos].meta.id)
                };
                if let Some(existing) = existing {
                    tracing::debug!(task = %key, %lane, existing = %existing, "duplicate submission dropped");
                    self.bus.publish(
                        Event::new(EventKind::DuplicateDropped)
                            .with_task(key.to_string())
                            .with_id(existing)
                            .with_lane(lane),
                    );
                    return Admission::Duplicate(existing);
                }
            }
            DedupPolicy::Replace => {
                if let Some(pos) = pending_dup {
                    let entry = self.new_entry(task, listener);
                    return self.replace_pending(pos, entry);
                }
                if running_dup {
                    let entry = self.new_entry(task, listener);
                    return self.replace_running(entry);
                }
            }
        }

        let entry = self.new_entry(task, listener);
        self.enqueue(entry, run_immediately)
    }

    fn new_entry(
        &mut self,
        task: TaskRef<O>,
        listener: Option<Box<dyn Listener<O>>>,
    ) -> Entry<O> {
        self.next_id += 1;
        let meta = TaskMeta {
            id: TaskId(self.next_id),
            key: task.key().clone(),
            lane: task.lane(),
        };
        Entry::new(meta, task, listener)
    }

    fn enqueue(&mut self, mut entry: Entry<O>, run_immediately: bool) -> Admission {
        let lane = entry.meta.lane;
        let id = entry.meta.id;
        self.announce_queued(&mut entry);

        if run_immediately && self.lanes[lane.index()].is_free() {
            self.start(entry);
            return Admission::Started(id);
        }

        self.lanes[lane.index()].pending.push_back(entry);
        self.promote(lane);

        if self.lanes[lane.index()].running_id() == Some(id) {
            Admission::Started(id)
        } else {
            Admission::Queued(id)
        }
    }

    /// Swaps a pending duplicate for `entry`, keeping its FIFO position.
    fn replace_pending(&mut self, pos: usize, mut entry: Entry<O>) -> Admission {
        let lane = entry.meta.lane;
        let id = entry.meta.id;
        let Some(old) = self.lanes[lane.index()].pending.remove(pos) else {
            return self.enqueue(entry, false);
        };
        let replaced = old.meta.id;

        self.bus
            .publish(Event::for_task(EventKind::TaskReplaced, &old.meta));
        self.retire_pending(old, "replaced");

        self.announce_queued(&mut entry);
        self.lanes[lane.index()].pending.insert(pos, entry);
        Admission::Replaced { id, replaced }
    }

    /// Asks the running duplicate to stop and puts `entry` at the lane front.
    fn replace_running(&mut self, mut entry: Entry<O>) -> Admission {
        let lane = entry.meta.lane;
        let replaced = self.lanes[lane.index()].running.as_mut().map(|running| {
            running.request_cancel();
            running.entry.meta.clone()
        });
        let Some(replaced) = replaced else {
            return self.enqueue(entry, false);
        };

        tracing::debug!(task = %replaced.key, %lane, id = %replaced.id, "replacing running task");
        self.bus
            .publish(Event::for_task(EventKind::CancelRequested, &replaced));

        let id = entry.meta.id;
        self.announce_queued(&mut entry);
        self.lanes[lane.index()].pending.push_front(entry);
        Admission::Replaced {
            id,
            replaced: replaced.id,
        }
    }

    fn announce_queued(&mut self, entry: &mut Entry<O>) {
        let meta = entry.meta.clone();
        tracing::debug!(task = %meta.key, lane = %meta.lane, id = %meta.id, "task queued");
        self.bus.publish(Event::for_task(EventKind::TaskQueued, &meta));
        notify(entry.listener.as_mut(), &mut self.listeners, |l| {
            l.on_queued(&meta)
        });
    }

    // ---------------------------
    // Cancellation
    // ---------------------------

    /// Cancels every task with `key`, in both lanes.
    ///
    /// Pending tasks are removed and never start: their listeners only see
    /// `on_cancelled`. Running tasks get their token cancelled and finish
    /// through the normal completion path with outcome `Cancelled`.
    ///
    /// Returns `true` if anything was removed or signalled.
    pub fn cancel(&mut self, key: &TaskKey) -> bool {
        self.cancel_where(|meta| &meta.key == key)
    }

    /// Cancels the task with submission id `id`.
    pub fn cancel_id(&mut self, id: TaskId) -> bool {
        self.cancel_where(|meta| meta.id == id)
    }

    fn cancel_where(&mut self, pred: impl Fn(&TaskMeta) -> bool) -> bool {
        let mut found = false;

        for lane in Lane::ALL {
            let removed = self.lanes[lane.index()].remove_pending(|meta| pred(meta));
            for entry in removed {
                found = true;
                self.retire_pending(entry, "pending");
            }

            if let Some(running) = self.lanes[lane.index()].running.as_mut() {
                if pred(&running.entry.meta) && running.request_cancel() {
                    found = true;
                    let meta = &running.entry.meta;
                    tracing::debug!(task = %meta.key, %lane, id = %meta.id, "cancel requested");
                    self.bus
                        .publish(Event::for_task(EventKind::CancelRequested, meta));
                }
            }
        }
        found
    }

    /// Moves a pending entry to `Cancelled` and tells its listeners.
    fn retire_pending(&mut self, mut entry: Entry<O>, reason: &'static str) {
        entry.state.advance(TaskState::Cancelled);
        let meta = entry.meta.clone();
        tracing::debug!(task = %meta.key, lane = %meta.lane, id = %meta.id, reason, "pending task removed");
        self.bus
            .publish(Event::for_task(EventKind::TaskCancelled, &meta).with_reason(reason));
        notify(entry.listener.as_mut(), &mut self.listeners, |l| {
            l.on_cancelled(&meta)
        });
    }

    /// Moves an aborted running entry to `Cancelled` and tells its listeners.
    fn retire_aborted(&mut self, mut entry: Entry<O>) {
        entry.state.advance(TaskState::Cancelled);
        let meta = entry.meta.clone();
        self.bus
            .publish(Event::for_task(EventKind::TaskCancelled, &meta).with_reason("aborted"));
        notify(entry.listener.as_mut(), &mut self.listeners, |l| {
            l.on_cancelled(&meta)
        });
    }

    // ---------------------------
    // Queries (read-only)
    // ---------------------------

    /// Number of tasks waiting in `lane`.
    pub fn pending_count(&self, lane: Lane) -> usize {
        self.lanes[lane.index()].pending.len()
    }

    /// Number of tasks running in `lane` (0 or 1).
    pub fn running_count(&self, lane: Lane) -> usize {
        usize::from(!self.lanes[lane.index()].is_free())
    }

    /// Whether `lane`'s running slot is occupied.
    pub fn is_running(&self, lane: Lane) -> bool {
        !self.lanes[lane.index()].is_free()
    }

    /// Tasks running across both lanes (0..=2).
    pub fn running_total(&self) -> usize {
        Lane::ALL.iter().map(|l| self.running_count(*l)).sum()
    }

    /// Keys waiting in `lane`, in FIFO order.
    pub fn queued_keys(&self, lane: Lane) -> Vec<TaskKey> {
        self.lanes[lane.index()]
            .pending
            .iter()
            .map(|e| e.meta.key.clone())
            .collect()
    }

    /// Key of the task in `lane`'s running slot.
    pub fn running_key(&self, lane: Lane) -> Option<TaskKey> {
        self.lanes[lane.index()]
            .running
            .as_ref()
            .map(|r| r.entry.meta.key.clone())
    }

    /// Whether a task with `key` is pending or running in any lane.
    pub fn contains(&self, key: &TaskKey) -> bool {
        self.lanes.iter().any(|slot| {
            slot.pending_position(key).is_some()
                || slot
                    .running
                    .as_ref()
                    .is_some_and(|r| &r.entry.meta.key == key)
        })
    }

    /// State of a live task. Tasks are forgotten once their outcome is delivered.
    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        self.lanes.iter().find_map(|slot| slot.state_of(id))
    }

    /// True when nothing is pending or running.
    pub fn is_idle(&self) -> bool {
        self.lanes
            .iter()
            .all(|slot| slot.is_free() && slot.pending.is_empty())
    }

    /// Read-only view of both lanes.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let lane = |slot: &LaneState<O>| LaneSnapshot {
            lane: slot.lane,
            running: slot
                .running
                .as_ref()
                .map(|r| (r.entry.meta.id, r.entry.meta.key.clone())),
            pending: slot
                .pending
                .iter()
                .map(|e| (e.meta.id, e.meta.key.clone()))
                .collect(),
        };
        SchedulerSnapshot {
            standard: lane(&self.lanes[Lane::Standard.index()]),
            instant: lane(&self.lanes[Lane::Instant.index()]),
        }
    }

    // ---------------------------
    // Driving the owning context
    // ---------------------------

    /// Waits for the next completion or handle command and processes it.
    ///
    /// Returns `false` without waiting when nothing can arrive any more:
    /// no task is running and no [`SchedulerHandle`] is alive.
    pub async fn turn(&mut self) -> bool {
        let has_running = self.running_total() > 0;
        if !has_running && self.commands.is_none() {
            return false;
        }

        let wake = {
            let done_rx = &mut self.done_rx;
            let cmd_rx = self.commands.as_mut().map(|c| &mut c.rx);
            tokio::select! {
                Some(done) = done_rx.recv(), if has_running => Wake::Done(done),
                cmd = recv_command(cmd_rx) => Wake::Command(cmd),
            }
        };

        match wake {
            Wake::Done(done) => self.on_task_completed(done),
            Wake::Command(Some(cmd)) => self.apply(cmd),
            Wake::Command(None) => {
                self.commands = None;
                return has_running;
            }
        }
        true
    }

    /// Processes everything that is already waiting, without blocking.
    ///
    /// Returns the number of completions and commands handled.
    pub fn poll_completions(&mut self) -> usize {
        let mut handled = 0;
        loop {
            if let Ok(done) = self.done_rx.try_recv() {
                self.on_task_completed(done);
                handled += 1;
                continue;
            }
            let Some(commands) = self.commands.as_mut() else {
                break;
            };
            match commands.rx.try_recv() {
                Ok(cmd) => {
                    self.apply(cmd);
                    handled += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.commands = None;
                    break;
                }
            }
        }
        handled
    }

    /// Turns until both lanes are empty.
    pub async fn run_until_idle(&mut self) {
        while !self.is_idle() {
            if !self.turn().await {
                break;
            }
        }
    }

    /// Cancels all pending work, signals running tasks and waits for them up
    /// to [`SchedulerConfig::grace`].
    ///
    /// Tasks still running after the grace period are aborted and reported in
    /// [`RuntimeError::GraceExceeded`].
    pub async fn shutdown(mut self) -> Result<(), RuntimeError> {
        tracing::info!(running = self.running_total(), "scheduler shutting down");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.commands = None;

        for lane in Lane::ALL {
            let drained: Vec<Entry<O>> = self.lanes[lane.index()].pending.drain(..).collect();
            for entry in drained {
                self.retire_pending(entry, "shutdown");
            }
            if let Some(running) = self.lanes[lane.index()].running.as_mut() {
                running.request_cancel();
            }
        }

        let grace = self.cfg.grace;
        match time::timeout(grace, self.drain_running()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let aborted: Vec<Running<O>> = self
                    .lanes
                    .iter_mut()
                    .filter_map(|slot| slot.running.take())
                    .collect();
                let mut stuck = Vec::with_capacity(aborted.len());
                for running in aborted {
                    running.join.abort();
                    stuck.push(running.entry.meta.key.to_string());
                    self.retire_aborted(running.entry);
                }
                tracing::warn!(?grace, ?stuck, "shutdown grace exceeded");
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    async fn drain_running(&mut self) {
        while self.running_total() > 0 {
            match self.done_rx.recv().await {
                Some(done) => self.on_task_completed(done),
                None => break,
            }
        }
    }

    fn apply(&mut self, cmd: Command<O>) {
        match cmd {
            Command::Submit {
                task,
                run_immediately,
            } => {
                let _ = self.submit(task, run_immediately);
            }
            Command::Cancel { key } => {
                self.cancel(&key);
            }
        }
    }

    // ---------------------------
    // Lane advancement
    // ---------------------------

    /// Starts the head of `lane`'s FIFO if its slot is free.
    fn promote(&mut self, lane: Lane) {
        let slot = &mut self.lanes[lane.index()];
        if !slot.is_free() {
            return;
        }
        if let Some(entry) = slot.pending.pop_front() {
            self.start(entry);
        }
    }

    /// Hands `entry` to the runtime and occupies its lane's slot.
    fn start(&mut self, mut entry: Entry<O>) {
        let meta = entry.meta.clone();
        assert!(
            self.lanes[meta.lane.index()].is_free(),
            "{} lane is busy; cannot start {}",
            meta.lane,
            meta.id
        );
        entry.state.advance(TaskState::Running);

        let cancel = self.runtime_token.child_token();
        let ctx = cancel.clone();
        let task = Arc::clone(&entry.task);
        let done_tx = self.done_tx.clone();
        let (id, lane) = (meta.id, meta.lane);

        let join = tokio::spawn(async move {
            let result = match AssertUnwindSafe(task.run(ctx)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(TaskError::Panicked {
                    info: crate::panic_message(&*panic),
                }),
            };
            // The receiver lives as long as the scheduler.
            let _ = done_tx.send(Completion { id, lane, result }).await;
        });

        tracing::debug!(task = %meta.key, %lane, id = %id, "task started");
        self.bus.publish(Event::for_task(EventKind::TaskStarted, &meta));
        notify(entry.listener.as_mut(), &mut self.listeners, |l| {
            l.on_started(&meta)
        });

        self.lanes[lane.index()].set_running(Running {
            entry,
            cancel,
            join,
            started_at: Instant::now(),
            cancel_requested: false,
        });
        debug_assert!(self.running_total() <= LANE_SLOTS);
    }

    /// Records a task's outcome, frees its slot, notifies, then promotes.
    fn on_task_completed(&mut self, done: Completion<O>) {
        let Running {
            mut entry,
            started_at,
            cancel_requested,
            ..
        } = self.lanes[done.lane.index()].take_running(done.id);

        let outcome = match done.result {
            _ if cancel_requested => Outcome::Cancelled,
            Err(TaskError::Canceled) => Outcome::Cancelled,
            Ok(output) => Outcome::Finished(output),
            Err(error) => Outcome::Failed(error),
        };
        entry.state.advance(outcome.state());

        let meta = entry.meta.clone();
        let elapsed = started_at.elapsed();
        let event = match &outcome {
            Outcome::Finished(_) => {
                tracing::debug!(task = %meta.key, lane = %meta.lane, id = %meta.id, ?elapsed, "task finished");
                Event::for_task(EventKind::TaskFinished, &meta)
            }
            Outcome::Failed(error) => {
                tracing::warn!(task = %meta.key, lane = %meta.lane, id = %meta.id, error = %error, "task failed");
                Event::for_task(EventKind::TaskFailed, &meta).with_reason(error.as_message())
            }
            Outcome::Cancelled => {
                tracing::debug!(task = %meta.key, lane = %meta.lane, id = %meta.id, ?elapsed, "task cancelled");
                Event::for_task(EventKind::TaskCancelled, &meta).with_reason("running")
            }
        };
        self.bus.publish(event);
        notify(entry.listener.as_mut(), &mut self.listeners, |l| {
            l.on_outcome(&meta, &outcome)
        });

        self.promote(done.lane);
    }
}

impl<O> Drop for Scheduler<O> {
    fn drop(&mut self) {
        self.runtime_token.cancel();
        self.fanout_token.cancel();
    }
}

/// Calls the per-submission listener first, then every global one.
fn notify<O>(
    own: Option<&mut Box<dyn Listener<O>>>,
    globals: &mut [Box<dyn Listener<O>>],
    mut f: impl FnMut(&mut Box<dyn Listener<O>>),
) {
    if let Some(listener) = own {
        f(listener);
    }
    for listener in globals {
        f(listener);
    }
}

async fn recv_command<O>(rx: Option<&mut mpsc::Receiver<Command<O>>>) -> Option<Command<O>> {
    match rx {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}
