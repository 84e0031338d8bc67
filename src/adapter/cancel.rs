//! Stopping a reconciliation run from outside
//!
//! A `ReconciliationRun` hands out its token through `cancellation_token()`;
//! the CLI trips it on Ctrl-C. The token is read at two points:
//!
//! - `FetchExpander::expand`, before each discovery round. A run cancelled
//!   here ends with `RunError::Cancelled` and submits nothing.
//! - `ReconciliationRun::submit`, before each resource's updates. Resources
//!   not yet started are left untouched and the summary is marked
//!   `cancelled`. Updates already sent to the target stay applied.
//!
//! Fetches and field updates in flight are never interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag for one run and whoever started it
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    stop: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the run should stop at its next check point
    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Ask the run to stop. Repeated calls have no further effect.
    pub fn cancel(&self) {
        if !self.stop.swap(true, Ordering::SeqCst) {
            tracing::info!("run cancellation requested");
        }
    }
}
