//! Relation resolution: mutual closure and collision-free ordering
//!
//! Both algorithms are fixed-point iterations over one run's graph. Each is
//! capped, and reports whether it actually reached its fixed point.

mod closure;
mod sort_order;

pub use closure::{ClosureBuilder, ClosureOutcome};
pub use sort_order::{SortOrderResolver, SortOutcome};

use serde::{Deserialize, Serialize};

/// How a capped fixed-point iteration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPoint {
    /// Passes (or rounds) executed
    pub passes: usize,
    /// True if a pass observed no change before the cap was hit
    pub stable: bool,
}

impl FixedPoint {
    /// Outcome for inputs that need no iteration at all
    pub fn settled() -> Self {
        Self {
            passes: 0,
            stable: true,
        }
    }

    /// Run `step` until it reports no change, or `max_passes` times.
    ///
    /// `step` returns whether it changed anything.
    pub fn iterate(max_passes: usize, mut step: impl FnMut() -> bool) -> Self {
        let mut passes = 0;
        while passes < max_passes {
            passes += 1;
            if !step() {
                return Self {
                    passes,
                    stable: true,
                };
            }
        }
        Self {
            passes,
            stable: false,
        }
    }
}
