//! Reconciliation of fetched field values against the target

mod dates;
mod fields;
mod report;

pub use dates::{merge_date_range, DateRange};
pub use fields::{keywords_satisfied, FieldReconciler};
pub use report::{
    FailedUpdate, FetchFailure, FieldUpdate, ResourceReport, RunSummary, UpdateReason,
};
