use crate::tasks::{Lane, TaskId, TaskKey};

/// Read-only view of one lane, for UI reflection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneSnapshot {
    pub lane: Lane,
    /// Task in the running slot, if any.
    pub running: Option<(TaskId, TaskKey)>,
    /// Pending tasks in FIFO order.
    pub pending: Vec<(TaskId, TaskKey)>,
}

/// Read-only view of both lanes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    pub standard: LaneSnapshot,
    pub instant: LaneSnapshot,
}

impl SchedulerSnapshot {
    /// Snapshot of `lane`.
    pub fn lane(&self, lane: Lane) -> &LaneSnapshot {
        match lane {
            Lane::Standard => &self.standard,
            Lane::Instant => &self.instant,
        }
    }

    /// Tasks currently running across both lanes (0..=2).
    pub fn running_total(&self) -> usize {
        usize::from(self.standard.running.is_some()) + usize::from(self.instant.running.is_some())
    }
}
