//! # Scheduler configuration.
//!
//! Provides [`SchedulerConfig`] centralized settings for the scheduler runtime.
//!
//! ## Sentinel values
//! - `grace = 0s` → shutdown does not wait; running tasks are aborted immediately
//! - capacities are clamped by the `*_clamped` accessors, never by callers

use std::time::Duration;

/// Number of execution slots: one per lane.
pub(crate) const LANE_SLOTS: usize = 2;

/// Configuration for the scheduler runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for running tasks on [`shutdown`](crate::Scheduler::shutdown)
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `completion_capacity`: Bounded channel carrying outcomes back to the owning context (min 2)
/// - `command_capacity`: Bounded channel behind [`SchedulerHandle`](crate::SchedulerHandle) (min 1)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid sprinkling
/// clamping across the codebase.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Maximum time to wait for running tasks during shutdown before aborting them.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events observe
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Capacity of the completion channel.
    ///
    /// At most one task per lane is in flight, so anything above 2 is headroom.
    pub completion_capacity: usize,

    /// Capacity of the cross-thread submission queue.
    ///
    /// When full, [`SchedulerHandle::try_submit`](crate::SchedulerHandle::try_submit)
    /// returns `Full`.
    pub command_capacity: usize,
}

impl SchedulerConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a completion capacity clamped to the number of lane slots.
    #[inline]
    pub fn completion_capacity_clamped(&self) -> usize {
        self.completion_capacity.max(LANE_SLOTS)
    }

    /// Returns a command capacity clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    /// - `completion_capacity = 16`
    /// - `command_capacity = 256`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            completion_capacity: 16,
            command_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacities_are_clamped() {
        let cfg = SchedulerConfig {
            grace: Duration::ZERO,
            bus_capacity: 0,
            completion_capacity: 0,
            command_capacity: 0,
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.completion_capacity_clamped(), 2);
        assert_eq!(cfg.command_capacity_clamped(), 1);
    }

    #[test]
    fn test_defaults_pass_through() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
        assert_eq!(cfg.completion_capacity_clamped(), 16);
        assert_eq!(cfg.grace, Duration::from_secs(30));
    }
}
