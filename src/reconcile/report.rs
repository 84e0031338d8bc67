//! Per-resource reports and the run summary

use crate::graph::{RecordId, ResourceId};
use crate::resolve::FixedPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a field was flagged for update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UpdateReason {
    /// The target has no value for the field
    Missing,
    /// The target holds a different value
    Mismatch { current: String },
}

/// A single field the target should receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub field: String,
    pub value: String,
    pub reason: UpdateReason,
}

/// A field update the target did not accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUpdate {
    pub field: String,
    pub message: String,
}

/// Outcome of reconciling one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReport {
    pub resource: ResourceId,
    pub record: RecordId,
    /// Everything the diff flagged
    pub planned: Vec<FieldUpdate>,
    /// Fields the target accepted
    pub updated: Vec<String>,
    pub failed: Vec<FailedUpdate>,
}

impl ResourceReport {
    pub fn new(resource: ResourceId, record: RecordId, planned: Vec<FieldUpdate>) -> Self {
        Self {
            resource,
            record,
            planned,
            updated: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Number of fields successfully written
    pub fn applied_count(&self) -> usize {
        self.updated.len()
    }

    /// True if the resource already matched the source
    pub fn is_in_sync(&self) -> bool {
        self.planned.is_empty()
    }
}

/// A record the run could not fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub record: RecordId,
    pub message: String,
}

/// Aggregate outcome of one reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Updates were planned but not submitted
    pub dry_run: bool,
    /// Records fetched into the graph
    pub records_processed: usize,
    /// Fetched records with no target counterpart
    pub skipped_unmapped: Vec<RecordId>,
    /// Mapped records whose resource is missing from the snapshot
    pub skipped_no_snapshot: Vec<RecordId>,
    /// Not found or transient failures
    pub fetch_errors: Vec<FetchFailure>,
    /// Records skipped because the source payload was unusable
    pub malformed: Vec<FetchFailure>,
    /// Records the expansion round cap left unfetched
    pub unexpanded: Vec<RecordId>,
    pub fields_updated: usize,
    pub fields_failed: usize,
    pub resources: Vec<ResourceReport>,
    /// Discovery rounds; unstable if the round cap cut expansion short
    pub expansion: FixedPoint,
    pub closure: FixedPoint,
    pub edges_inferred: usize,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn begin(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            records_processed: 0,
            skipped_unmapped: Vec::new(),
            skipped_no_snapshot: Vec::new(),
            fetch_errors: Vec::new(),
            malformed: Vec::new(),
            unexpanded: Vec::new(),
            fields_updated: 0,
            fields_failed: 0,
            resources: Vec::new(),
            expansion: FixedPoint::settled(),
            closure: FixedPoint::settled(),
            edges_inferred: 0,
            cancelled: false,
        }
    }

    /// Recompute totals from the resource reports and stamp the end time
    pub fn finish(&mut self) {
        self.fields_updated = self.resources.iter().map(|r| r.applied_count()).sum();
        self.fields_failed = self.resources.iter().map(|r| r.failed.len()).sum();
        self.finished_at = Some(Utc::now());
    }

    /// Fields flagged across all resources
    pub fn fields_planned(&self) -> usize {
        self.resources.iter().map(|r| r.planned.len()).sum()
    }

    pub fn report_for(&self, resource: &ResourceId) -> Option<&ResourceReport> {
        self.resources.iter().find(|r| &r.resource == resource)
    }
}
