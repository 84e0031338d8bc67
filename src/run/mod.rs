//! One reconciliation run: expand, close, order, reconcile

mod expand;
mod orchestrator;
mod state;

pub use expand::FetchExpander;
pub use orchestrator::{ReconciliationRun, RunOptions};
pub use state::RunState;

use crate::adapter::{FetchError, SnapshotError};
use crate::graph::GraphError;
use thiserror::Error;

/// Errors that end a run early.
///
/// Per-record and per-field failures are not here; they are collected in the
/// run summary.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Target snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Aborted on malformed source data: {0}")]
    Malformed(FetchError),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}
