//! RelationGraph: records of one run and their related-work edges

use super::edge::{RelatedWork, RelationType};
use super::record::{FieldMap, Record, RecordId, RelationSet};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors from graph mutation
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory record graph, written once per run and never shrunk.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    records: BTreeMap<RecordId, Record>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record with its implicit self-edge.
    ///
    /// Idempotent: returns `false` and leaves the record untouched if it
    /// already exists.
    pub fn add_record(&mut self, id: RecordId) -> bool {
        if self.records.contains_key(&id) {
            return false;
        }
        self.records.insert(id.clone(), Record::new(id));
        true
    }

    /// Insert an edge unless `from` already has one to `to`.
    ///
    /// First writer wins; returns whether the edge was inserted.
    pub fn add_edge(
        &mut self,
        from: &RecordId,
        to: RecordId,
        relation_type: RelationType,
        sort_order: u32,
    ) -> GraphResult<bool> {
        self.insert_related(from, RelatedWork::new(to, relation_type, sort_order))
    }

    /// Insert a prepared edge under the same first-writer-wins rule
    pub fn insert_related(&mut self, from: &RecordId, edge: RelatedWork) -> GraphResult<bool> {
        let record = self
            .records
            .get_mut(from)
            .ok_or_else(|| GraphError::RecordNotFound(from.clone()))?;
        if record.relations.contains_key(&edge.target) {
            return Ok(false);
        }
        record.relations.insert(edge.target.clone(), edge);
        Ok(true)
    }

    /// Replace a record's fetched field values
    pub fn set_fields(&mut self, id: &RecordId, fields: FieldMap) -> GraphResult<()> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| GraphError::RecordNotFound(id.clone()))?;
        record.fields = fields;
        Ok(())
    }

    /// All known record identifiers
    pub fn record_ids(&self) -> BTreeSet<RecordId> {
        self.records.keys().cloned().collect()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &RecordId) -> Option<&mut Record> {
        self.records.get_mut(id)
    }

    /// Relation set of a record
    pub fn relations(&self, id: &RecordId) -> Option<&RelationSet> {
        self.records.get(id).map(|r| &r.relations)
    }

    /// Snapshot of every relation set, for algorithms that need a working copy
    pub fn relation_sets(&self) -> BTreeMap<RecordId, RelationSet> {
        self.records
            .iter()
            .map(|(id, record)| (id.clone(), record.relations.clone()))
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.values_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total number of edges, self-edges included
    pub fn edge_count(&self) -> usize {
        self.records.values().map(|r| r.relations.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RecordId {
        RecordId::from(s)
    }

    #[test]
    fn add_record_is_idempotent() {
        let mut graph = RelationGraph::new();
        assert!(graph.add_record(id("R1")));
        graph
            .add_edge(&id("R1"), id("R2"), RelationType::HasPart, 2)
            .unwrap();

        assert!(!graph.add_record(id("R1")));
        assert_eq!(graph.len(), 1);
        // Re-adding must not reset existing edges
        assert_eq!(graph.relations(&id("R1")).unwrap().len(), 2);
    }

    #[test]
    fn first_edge_to_a_target_wins() {
        let mut graph = RelationGraph::new();
        graph.add_record(id("R1"));

        assert!(graph
            .add_edge(&id("R1"), id("R2"), RelationType::HasPart, 3)
            .unwrap());
        assert!(!graph
            .add_edge(&id("R1"), id("R2"), RelationType::IsPartOf, 1)
            .unwrap());

        let edge = &graph.relations(&id("R1")).unwrap()[&id("R2")];
        assert_eq!(edge.relation_type, RelationType::HasPart);
        assert_eq!(edge.sort_order, 3);
    }

    #[test]
    fn self_edge_cannot_be_replaced() {
        let mut graph = RelationGraph::new();
        graph.add_record(id("R1"));
        assert!(!graph
            .add_edge(&id("R1"), id("R1"), RelationType::IsPartOf, 9)
            .unwrap());
        assert_eq!(graph.relations(&id("R1")).unwrap()[&id("R1")].sort_order, 1);
    }

    #[test]
    fn edge_from_unknown_record_is_an_error() {
        let mut graph = RelationGraph::new();
        let err = graph
            .add_edge(&id("nope"), id("R2"), RelationType::Relation, 1)
            .unwrap_err();
        assert!(matches!(err, GraphError::RecordNotFound(_)));
    }

    #[test]
    fn record_ids_lists_every_record() {
        let mut graph = RelationGraph::new();
        graph.add_record(id("b"));
        graph.add_record(id("a"));
        // Edge targets are not records until fetched
        graph
            .add_edge(&id("a"), id("c"), RelationType::Relation, 1)
            .unwrap();

        let ids: Vec<_> = graph.record_ids().into_iter().collect();
        assert_eq!(ids, vec![id("a"), id("b")]);
        assert_eq!(graph.edge_count(), 3);
    }
}
