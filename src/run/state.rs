//! Per-run working state

use crate::adapter::{FetchError, FetchedRecord};
use crate::config::DateFieldNames;
use crate::graph::{GraphResult, RecordId, RelationGraph};
use crate::reconcile::{merge_date_range, FetchFailure};
use std::collections::BTreeSet;

/// Everything one run accumulates while discovering records.
///
/// Owned by a single run and dropped with it; nothing carries over between
/// runs.
#[derive(Debug, Default)]
pub struct RunState {
    pub graph: RelationGraph,
    attempted: BTreeSet<RecordId>,
    pub fetch_failures: Vec<FetchFailure>,
    pub malformed: Vec<FetchFailure>,
    /// Discovered but left unfetched when the round cap was hit
    pub unexpanded: Vec<RecordId>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a fetch attempt. Returns `false` if the record was already tried.
    pub fn mark_attempted(&mut self, id: RecordId) -> bool {
        self.attempted.insert(id)
    }

    pub fn was_attempted(&self, id: &RecordId) -> bool {
        self.attempted.contains(id)
    }

    pub fn attempted_count(&self) -> usize {
        self.attempted.len()
    }

    /// Add a fetched record: its edges in source order, then its fields with
    /// the date bounds folded into one range.
    pub fn absorb(
        &mut self,
        id: RecordId,
        fetched: FetchedRecord,
        dates: &DateFieldNames,
    ) -> GraphResult<()> {
        self.graph.add_record(id.clone());
        for edge in fetched.edges {
            self.graph.insert_related(&id, edge.into_related())?;
        }
        let mut fields = fetched.fields;
        merge_date_range(&mut fields, dates);
        self.graph.set_fields(&id, fields)
    }

    /// File a failed fetch under fetch errors or malformed records
    pub fn record_failure(&mut self, id: RecordId, error: &FetchError) {
        let failure = FetchFailure {
            record: id,
            message: error.to_string(),
        };
        if error.is_malformed() {
            self.malformed.push(failure);
        } else {
            self.fetch_failures.push(failure);
        }
    }

    /// Edge targets that have not been fetched or attempted yet
    pub fn frontier(&self) -> BTreeSet<RecordId> {
        self.graph
            .records()
            .flat_map(|record| record.relations.keys())
            .filter(|target| !self.attempted.contains(*target))
            .cloned()
            .collect()
    }
}
