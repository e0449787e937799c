//! # Task classification.

use std::fmt;

/// Lane a task runs in. Fixed when the task is constructed.
///
/// - [`Lane::Standard`]: heavy work, strictly sequential with other standard tasks.
/// - [`Lane::Instant`]: light, user-triggered work that must not wait behind standard tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lane {
    Standard,
    Instant,
}

impl Lane {
    /// Both lanes, in index order.
    pub const ALL: [Lane; 2] = [Lane::Standard, Lane::Instant];

    /// Stable lowercase name (`standard` / `instant`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Standard => "standard",
            Lane::Instant => "instant",
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Lane::Standard => 0,
            Lane::Instant => 1,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
