use std::collections::HashMap;
use std::sync::Arc;

use crate::error::TaskError;
use crate::listeners::Listener;
use crate::tasks::{Lane, TaskId, TaskMeta};

use super::types::{ResultStatus, Status, StatusSource};

#[derive(Debug, Default)]
struct StatusEntry {
    status: Status,
    /// Live standard claimants, oldest first. The last one is the owner.
    claims: Vec<Claim>,
    /// Status to restore once every claimant ends without a result.
    before: Status,
}

#[derive(Debug, Clone, Copy)]
struct Claim {
    id: TaskId,
    running: bool,
}

impl StatusEntry {
    fn claim(&self, id: TaskId) -> Option<usize> {
        self.claims.iter().position(|c| c.id == id)
    }

    /// Workflow status while claimants remain; `resting` once none do.
    fn settle(&mut self, resting: Status) {
        if self.claims.is_empty() {
            self.status = resting;
        } else {
            self.before = resting;
            self.status = if self.claims.iter().any(|c| c.running) {
                Status::Processing
            } else {
                Status::Queued
            };
        }
    }
}

/// Single-writer status table keyed by task target.
///
/// Register it as a global listener through `Rc<RefCell<StatusMapper>>` and
/// keep a clone to read statuses from the owning context:
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use worklane::{Lane, ResultStatus, Scheduler, SchedulerConfig, Status, StatusMapper, TaskError, TaskFn, TaskKey};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let statuses = Rc::new(RefCell::new(StatusMapper::new()));
/// let mut sched = Scheduler::<ResultStatus>::new(SchedulerConfig::default());
/// sched.add_listener(Rc::clone(&statuses));
///
/// let analyze = TaskFn::arc(
///     TaskKey::new("analyze", "tracks/intro.flac"),
///     Lane::Standard,
///     |_ctx: CancellationToken| async { Ok::<_, TaskError>(ResultStatus::Match) },
/// );
/// sched.submit(analyze, true);
/// assert_eq!(statuses.borrow().status("tracks/intro.flac"), Status::Processing);
///
/// sched.run_until_idle().await;
/// assert_eq!(statuses.borrow().status("tracks/intro.flac"), Status::Match);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StatusMapper {
    entries: HashMap<Arc<str>, StatusEntry>,
}

impl StatusMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of `target` (`Idle` if never written).
    pub fn status(&self, target: &str) -> Status {
        self.entries
            .get(target)
            .map(|e| e.status.clone())
            .unwrap_or_default()
    }

    /// Newest live standard task claiming `target`.
    pub fn owner(&self, target: &str) -> Option<TaskId> {
        self.entries
            .get(target)
            .and_then(|e| e.claims.last())
            .map(|c| c.id)
    }

    /// Seeds a status loaded from elsewhere. Refused while a task claims the target.
    pub fn set_initial(&mut self, target: impl Into<Arc<str>>, status: Status) -> bool {
        let entry = self.entries.entry(target.into()).or_default();
        if !entry.claims.is_empty() {
            return false;
        }
        entry.status = status;
        true
    }

    /// Adds `meta.id` as the newest claimant of `meta.key.target()`.
    ///
    /// The target shows `Queued` unless an older claimant is already running.
    /// The status seen before the first claim is kept so it can be restored
    /// when every claimant ends without a result.
    ///
    /// # Panics
    /// If `meta` is an instant task.
    pub fn mark_queued(&mut self, meta: &TaskMeta) {
        assert_standard(meta);
        let entry = self.entries.entry(meta.key.target_arc()).or_default();
        if entry.claim(meta.id).is_some() {
            return;
        }
        if entry.claims.is_empty() {
            entry.before = entry.status.clone();
        } else {
            tracing::debug!(target_key = %meta.key, new_owner = %meta.id, "status ownership moved");
        }
        entry.claims.push(Claim {
            id: meta.id,
            running: false,
        });
        let resting = entry.before.clone();
        entry.settle(resting);
    }

    /// Sets `Processing` if `meta.id` claims the target.
    ///
    /// # Panics
    /// If `meta` is an instant task.
    pub fn mark_processing(&mut self, meta: &TaskMeta) -> bool {
        assert_standard(meta);
        let Some((entry, pos)) = self.claimed(meta) else {
            return false;
        };
        entry.claims[pos].running = true;
        entry.status = Status::Processing;
        true
    }

    /// Writes a finished task's result and drops its claim.
    ///
    /// `None` leaves the status from before the task was queued. While newer
    /// claimants remain the result is kept behind their workflow status.
    ///
    /// # Panics
    /// If `meta` is an instant task: instant work never writes result statuses.
    pub fn record_result(&mut self, meta: &TaskMeta, result: Option<ResultStatus>) -> bool {
        assert_standard(meta);
        let Some((entry, pos)) = self.claimed(meta) else {
            return false;
        };
        entry.claims.remove(pos);
        let resting = match result {
            Some(r) => r.into(),
            None => entry.before.clone(),
        };
        entry.settle(resting);
        true
    }

    /// Writes `Error` with the task's exact message and drops its claim.
    ///
    /// # Panics
    /// If `meta` is an instant task.
    pub fn record_error(&mut self, meta: &TaskMeta, error: &TaskError) -> bool {
        assert_standard(meta);
        let Some((entry, pos)) = self.claimed(meta) else {
            return false;
        };
        entry.claims.remove(pos);
        entry.settle(Status::Error(error.as_message().into()));
        true
    }

    /// Drops the claim of `meta.id` without a result.
    ///
    /// Ownership falls back to the newest remaining claimant; with none left
    /// the prior status is restored.
    pub fn release(&mut self, meta: &TaskMeta) -> bool {
        let Some((entry, pos)) = self.claimed(meta) else {
            return false;
        };
        entry.claims.remove(pos);
        let resting = entry.before.clone();
        entry.settle(resting);
        true
    }

    fn claimed(&mut self, meta: &TaskMeta) -> Option<(&mut StatusEntry, usize)> {
        let found = self.entries.get_mut(meta.key.target()).and_then(|e| {
            let pos = e.claim(meta.id)?;
            Some((e, pos))
        });
        if found.is_none() {
            tracing::debug!(task = %meta.key, id = %meta.id, "status write from non-claimant dropped");
        }
        found
    }
}

fn assert_standard(meta: &TaskMeta) {
    assert!(
        meta.lane == Lane::Standard,
        "instant task {} ({}) attempted a status write",
        meta.id,
        meta.key
    );
}

impl<O: StatusSource> Listener<O> for StatusMapper {
    fn on_queued(&mut self, meta: &TaskMeta) {
        if meta.lane == Lane::Standard {
            self.mark_queued(meta);
        }
    }

    fn on_started(&mut self, meta: &TaskMeta) {
        if meta.lane == Lane::Standard {
            self.mark_processing(meta);
        }
    }

    fn on_completed(&mut self, meta: &TaskMeta, output: &O) {
        if meta.lane == Lane::Standard {
            self.record_result(meta, output.result_status());
        }
    }

    fn on_error(&mut self, meta: &TaskMeta, error: &TaskError) {
        if meta.lane == Lane::Standard {
            self.record_error(meta, error);
        }
    }

    fn on_cancelled(&mut self, meta: &TaskMeta) {
        if meta.lane == Lane::Standard {
            self.release(meta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskKey;

    fn meta(id: u64, target: &str, lane: Lane) -> TaskMeta {
        TaskMeta {
            id: TaskId(id),
            key: TaskKey::new("analyze", target),
            lane,
        }
    }

    #[test]
    fn test_standard_lifecycle() {
        let mut m = StatusMapper::new();
        let t = meta(1, "a", Lane::Standard);

        m.mark_queued(&t);
        assert_eq!(m.status("a"), Status::Queued);
        assert_eq!(m.owner("a"), Some(TaskId(1)));

        assert!(m.mark_processing(&t));
        assert_eq!(m.status("a"), Status::Processing);

        assert!(m.record_result(&t, Some(ResultStatus::Mismatch)));
        assert_eq!(m.status("a"), Status::Mismatch);
        assert_eq!(m.owner("a"), None);
    }

    #[test]
    fn test_second_terminal_write_is_dropped() {
        let mut m = StatusMapper::new();
        let t = meta(1, "a", Lane::Standard);
        m.mark_queued(&t);

        assert!(m.record_result(&t, Some(ResultStatus::Match)));
        assert!(!m.record_error(&t, &TaskError::fail("late")));
        assert_eq!(m.status("a"), Status::Match);
    }

    #[test]
    fn test_newest_claimant_owns_target() {
        let mut m = StatusMapper::new();
        let old = meta(1, "a", Lane::Standard);
        let new = meta(2, "a", Lane::Standard);

        m.mark_queued(&old);
        m.mark_processing(&old);
        m.mark_queued(&new);
        assert_eq!(m.owner("a"), Some(TaskId(2)));
        assert_eq!(m.status("a"), Status::Processing);

        assert!(m.record_result(&old, Some(ResultStatus::Match)));
        assert_eq!(m.status("a"), Status::Queued);
        assert_eq!(m.owner("a"), Some(TaskId(2)));

        assert!(m.record_result(&new, Some(ResultStatus::Updated)));
        assert_eq!(m.status("a"), Status::Updated);
        assert_eq!(m.owner("a"), None);
    }

    #[test]
    fn test_released_claim_hands_back_to_running_task() {
        let mut m = StatusMapper::new();
        let running = meta(1, "a", Lane::Standard);
        let follow_up = meta(2, "a", Lane::Standard);

        m.mark_queued(&running);
        m.mark_processing(&running);
        m.mark_queued(&follow_up);

        assert!(m.release(&follow_up));
        assert_eq!(m.owner("a"), Some(TaskId(1)));
        assert_eq!(m.status("a"), Status::Processing);

        assert!(m.record_result(&running, Some(ResultStatus::Match)));
        assert_eq!(m.status("a"), Status::Match);
    }

    #[test]
    fn test_earlier_result_survives_cancelled_follow_up() {
        let mut m = StatusMapper::new();
        let first = meta(1, "a", Lane::Standard);
        let second = meta(2, "a", Lane::Standard);

        m.mark_queued(&first);
        m.mark_queued(&second);
        m.mark_processing(&first);
        m.record_error(&first, &TaskError::fail("bad header"));
        assert_eq!(m.status("a"), Status::Queued);

        m.release(&second);
        assert_eq!(m.status("a"), Status::Error("bad header".into()));
    }

    #[test]
    fn test_release_restores_prior_status() {
        let mut m = StatusMapper::new();
        assert!(m.set_initial("a", Status::Resolved));
        let t = meta(1, "a", Lane::Standard);

        m.mark_queued(&t);
        assert!(!m.set_initial("a", Status::Idle));
        assert!(m.release(&t));
        assert_eq!(m.status("a"), Status::Resolved);
    }

    #[test]
    fn test_empty_result_restores_prior_status() {
        let mut m = StatusMapper::new();
        m.set_initial("a", Status::Match);
        let t = meta(1, "a", Lane::Standard);

        m.mark_queued(&t);
        m.mark_processing(&t);
        assert!(m.record_result(&t, None));
        assert_eq!(m.status("a"), Status::Match);
    }

    #[test]
    fn test_error_keeps_exact_message() {
        let mut m = StatusMapper::new();
        let t = meta(1, "a", Lane::Standard);
        m.mark_queued(&t);

        m.record_error(&t, &TaskError::fail("vocal model missing: /models/sep.onnx"));
        assert_eq!(
            m.status("a"),
            Status::Error("vocal model missing: /models/sep.onnx".into())
        );
    }

    #[test]
    fn test_listener_ignores_instant_tasks() {
        let mut m = StatusMapper::new();
        m.set_initial("a", Status::Match);
        let t = meta(1, "a", Lane::Instant);

        Listener::<ResultStatus>::on_queued(&mut m, &t);
        Listener::<ResultStatus>::on_started(&mut m, &t);
        Listener::<ResultStatus>::on_completed(&mut m, &t, &ResultStatus::Mismatch);

        assert_eq!(m.status("a"), Status::Match);
        assert_eq!(m.owner("a"), None);
    }

    #[test]
    #[should_panic(expected = "attempted a status write")]
    fn test_instant_result_write_panics() {
        let mut m = StatusMapper::new();
        m.record_result(&meta(1, "a", Lane::Instant), Some(ResultStatus::Match));
    }

    mod with_scheduler {
        use super::*;
        use crate::config::SchedulerConfig;
        use crate::scheduler::Scheduler;
        use crate::tasks::{TaskFn, TaskRef};
        use std::cell::RefCell;
        use std::rc::Rc;
        use tokio::sync::Notify;
        use tokio_util::sync::CancellationToken;

        fn task(kind: &str, lane: Lane, out: Result<ResultStatus, &'static str>) -> TaskRef<ResultStatus> {
            TaskFn::arc(TaskKey::new(kind, "a"), lane, move |_ctx: CancellationToken| async move {
                out.map_err(|e| TaskError::fail(e))
            })
        }

        #[tokio::test]
        async fn test_instant_completion_leaves_status() {
            let statuses = Rc::new(RefCell::new(StatusMapper::new()));
            let mut sched = Scheduler::new(SchedulerConfig::default());
            sched.add_listener(Rc::clone(&statuses));

            sched.submit(task("analyze", Lane::Standard, Ok(ResultStatus::Match)), true);
            sched.submit(task("preview", Lane::Instant, Ok(ResultStatus::Mismatch)), true);
            sched.run_until_idle().await;

            assert_eq!(statuses.borrow().status("a"), Status::Match);
        }

        #[tokio::test]
        async fn test_failure_message_becomes_error_status() {
            let statuses = Rc::new(RefCell::new(StatusMapper::new()));
            let mut sched = Scheduler::new(SchedulerConfig::default());
            sched.add_listener(Rc::clone(&statuses));

            sched.submit(task("analyze", Lane::Standard, Err("unsupported codec: opus")), true);
            sched.run_until_idle().await;

            assert_eq!(
                statuses.borrow().status("a"),
                Status::Error("unsupported codec: opus".into())
            );
        }

        #[tokio::test]
        async fn test_cancelled_pending_task_restores_status() {
            let statuses = Rc::new(RefCell::new(StatusMapper::new()));
            statuses.borrow_mut().set_initial("a", Status::Resolved);
            let mut sched = Scheduler::new(SchedulerConfig::default());
            sched.add_listener(Rc::clone(&statuses));

            let blocker: TaskRef<ResultStatus> = TaskFn::arc(
                TaskKey::new("scan", "library"),
                Lane::Standard,
                |ctx: CancellationToken| async move {
                    ctx.cancelled().await;
                    Err::<ResultStatus, TaskError>(TaskError::Canceled)
                },
            );
            sched.submit(blocker, true);
            sched.submit(task("analyze", Lane::Standard, Ok(ResultStatus::Match)), true);
            assert_eq!(statuses.borrow().status("a"), Status::Queued);

            assert!(sched.cancel(&TaskKey::new("analyze", "a")));
            assert_eq!(statuses.borrow().status("a"), Status::Resolved);
            assert_eq!(statuses.borrow().owner("a"), None);
        }

        #[tokio::test]
        async fn test_cancelled_follow_up_keeps_running_task_status() {
            let statuses = Rc::new(RefCell::new(StatusMapper::new()));
            let mut sched = Scheduler::new(SchedulerConfig::default());
            sched.add_listener(Rc::clone(&statuses));

            let gate = Arc::new(Notify::new());
            let wait = Arc::clone(&gate);
            let analyze: TaskRef<ResultStatus> = TaskFn::arc(
                TaskKey::new("analyze", "a"),
                Lane::Standard,
                move |_ctx: CancellationToken| {
                    let wait = Arc::clone(&wait);
                    async move {
                        wait.notified().await;
                        Ok::<_, TaskError>(ResultStatus::Match)
                    }
                },
            );
            let running = sched.submit(analyze, true).id();
            sched.submit(task("normalize", Lane::Standard, Ok(ResultStatus::Updated)), true);
            assert_eq!(statuses.borrow().status("a"), Status::Processing);

            assert!(sched.cancel(&TaskKey::new("normalize", "a")));
            assert_eq!(statuses.borrow().status("a"), Status::Processing);
            assert_eq!(statuses.borrow().owner("a"), Some(running));

            gate.notify_one();
            sched.run_until_idle().await;
            assert_eq!(statuses.borrow().status("a"), Status::Match);
            assert_eq!(statuses.borrow().owner("a"), None);
        }
    }
}
