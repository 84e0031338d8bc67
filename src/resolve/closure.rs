//! Mutual closure of relation sets across the fetched records

use super::FixedPoint;
use crate::graph::{RecordId, RelatedWork, RelationGraph, RelationSet};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Result of closing a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureOutcome {
    /// How the propagation loop ended
    pub fixed_point: FixedPoint,
    /// Edges merged into the graph by closure
    pub inferred: usize,
}

/// Makes relation sets mutually consistent across the records of one run.
///
/// Whenever one fetched record relates to another, each absorbs the other's
/// relations until nothing changes, so every connected group of fetched
/// records ends up with identical relation sets. Inferred edges are typed
/// `relation` and copy the sort order of the edge they came from. Only edges
/// whose target was itself fetched are merged back; edges to unfetched
/// records stay on the record that declared them.
#[derive(Debug, Clone, Default)]
pub struct ClosureBuilder {
    max_passes: Option<usize>,
}

impl ClosureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the pass cap (defaults to record count + 1, which bounds the
    /// graph's diameter plus the confirming pass)
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = Some(max_passes);
        self
    }

    pub fn close(&self, graph: &mut RelationGraph) -> ClosureOutcome {
        let mut working = graph.relation_sets();
        let max_passes = self.max_passes.unwrap_or(working.len() + 1);

        let fixed_point = FixedPoint::iterate(max_passes, || propagate(&mut working));
        if !fixed_point.stable {
            warn!(
                passes = fixed_point.passes,
                "relation closure hit its pass cap before stabilizing"
            );
        }

        let inferred = merge_fetched(graph, working);
        debug!(passes = fixed_point.passes, inferred, "relation closure complete");

        ClosureOutcome {
            fixed_point,
            inferred,
        }
    }
}

/// One propagation pass over a snapshot of the working sets.
///
/// For every pair where `other` relates to `record`, `other` absorbs the
/// relations of `record` and `record` absorbs those of `other`.
fn propagate(working: &mut BTreeMap<RecordId, RelationSet>) -> bool {
    let snapshot = working.clone();
    let mut changed = false;

    for (record_id, related) in &snapshot {
        for (other_id, other_related) in &snapshot {
            if other_id == record_id || !other_related.contains_key(record_id) {
                continue;
            }
            changed |= absorb(working, other_id, related);
            changed |= absorb(working, record_id, other_related);
        }
    }

    changed
}

fn absorb(
    working: &mut BTreeMap<RecordId, RelationSet>,
    into: &RecordId,
    from: &RelationSet,
) -> bool {
    let Some(relations) = working.get_mut(into) else {
        return false;
    };
    let mut changed = false;
    for edge in from.values() {
        if !relations.contains_key(&edge.target) {
            relations.insert(edge.target.clone(), RelatedWork::inferred_from(edge));
            changed = true;
        }
    }
    changed
}

/// Merge edges to fetched records back into the graph, never overwriting.
fn merge_fetched(graph: &mut RelationGraph, working: BTreeMap<RecordId, RelationSet>) -> usize {
    let fetched = graph.record_ids();
    let mut inferred = 0;

    for (record_id, relations) in working {
        let Some(record) = graph.get_mut(&record_id) else {
            continue;
        };
        for edge in relations.into_values() {
            if !fetched.contains(&edge.target) || record.relates_to(&edge.target) {
                continue;
            }
            record
                .relations
                .insert(edge.target.clone(), RelatedWork::inferred_from(&edge));
            inferred += 1;
        }
    }

    inferred
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RelationType;
    use std::collections::BTreeSet;

    fn id(s: &str) -> RecordId {
        RecordId::from(s)
    }

    fn graph_with(records: &[&str], edges: &[(&str, &str, RelationType, u32)]) -> RelationGraph {
        let mut graph = RelationGraph::new();
        for r in records {
            graph.add_record(id(r));
        }
        for (from, to, relation_type, order) in edges {
            graph
                .add_edge(&id(from), id(to), relation_type.clone(), *order)
                .unwrap();
        }
        graph
    }

    fn targets(graph: &RelationGraph, record: &str) -> BTreeSet<RecordId> {
        graph.relations(&id(record)).unwrap().keys().cloned().collect()
    }

    #[test]
    fn three_record_chain_becomes_fully_connected() {
        let mut graph = graph_with(
            &["R1", "R2", "R3"],
            &[
                ("R1", "R2", RelationType::HasPart, 2),
                ("R2", "R3", RelationType::IsPartOf, 2),
            ],
        );

        let outcome = ClosureBuilder::new().close(&mut graph);
        assert!(outcome.fixed_point.stable);

        let all: BTreeSet<_> = [id("R1"), id("R2"), id("R3")].into_iter().collect();
        for record in ["R1", "R2", "R3"] {
            assert_eq!(targets(&graph, record), all, "relation set of {}", record);
        }

        // Declared edges keep their type
        let r1 = graph.relations(&id("R1")).unwrap();
        assert_eq!(r1[&id("R2")].relation_type, RelationType::HasPart);
        let r2 = graph.relations(&id("R2")).unwrap();
        assert_eq!(r2[&id("R3")].relation_type, RelationType::IsPartOf);

        // Everything closure added is generic
        assert_eq!(r1[&id("R3")].relation_type, RelationType::Relation);
        let r3 = graph.relations(&id("R3")).unwrap();
        assert_eq!(r3[&id("R1")].relation_type, RelationType::Relation);
        assert_eq!(r3[&id("R2")].relation_type, RelationType::Relation);
        assert_eq!(outcome.inferred, 4);
    }

    #[test]
    fn declared_back_edge_keeps_its_type() {
        let mut graph = graph_with(
            &["R1", "R2", "R3"],
            &[
                ("R1", "R2", RelationType::HasPart, 2),
                ("R2", "R3", RelationType::IsPartOf, 2),
                ("R3", "R2", RelationType::IsPartOf, 3),
            ],
        );

        ClosureBuilder::new().close(&mut graph);

        let r3 = graph.relations(&id("R3")).unwrap();
        assert_eq!(r3.len(), 3);
        assert_eq!(r3[&id("R2")].relation_type, RelationType::IsPartOf);
        assert_eq!(r3[&id("R2")].sort_order, 3);
        assert_eq!(r3[&id("R1")].relation_type, RelationType::Relation);
    }

    #[test]
    fn inferred_edges_copy_sort_order() {
        let mut graph = graph_with(
            &["A", "B"],
            &[
                ("A", "B", RelationType::HasPart, 5),
                ("B", "C", RelationType::Relation, 7),
            ],
        );
        graph.add_record(id("C"));

        ClosureBuilder::new().close(&mut graph);

        let a = graph.relations(&id("A")).unwrap();
        assert_eq!(a[&id("C")].sort_order, 7);
    }

    #[test]
    fn unfetched_targets_are_not_propagated() {
        let mut graph = graph_with(
            &["A", "B"],
            &[
                ("A", "B", RelationType::Relation, 2),
                ("B", "ghost", RelationType::HasPart, 3),
            ],
        );

        ClosureBuilder::new().close(&mut graph);

        assert!(!targets(&graph, "A").contains(&id("ghost")));
        // The declaring record keeps its edge
        assert!(targets(&graph, "B").contains(&id("ghost")));
    }

    #[test]
    fn disconnected_groups_stay_apart() {
        let mut graph = graph_with(
            &["A", "B", "X", "Y"],
            &[
                ("A", "B", RelationType::Relation, 2),
                ("X", "Y", RelationType::Relation, 2),
            ],
        );

        ClosureBuilder::new().close(&mut graph);

        assert_eq!(targets(&graph, "A").len(), 2);
        assert!(!targets(&graph, "A").contains(&id("X")));
        assert_eq!(targets(&graph, "Y"), [id("X"), id("Y")].into_iter().collect());
    }

    #[test]
    fn cycles_terminate() {
        let mut graph = graph_with(
            &["A", "B", "C"],
            &[
                ("A", "B", RelationType::Relation, 1),
                ("B", "C", RelationType::Relation, 1),
                ("C", "A", RelationType::Relation, 1),
            ],
        );

        let outcome = ClosureBuilder::new().close(&mut graph);
        assert!(outcome.fixed_point.stable);
        for record in ["A", "B", "C"] {
            assert_eq!(targets(&graph, record).len(), 3);
        }
    }

    #[test]
    fn closure_is_mutual_for_every_related_pair() {
        let mut graph = graph_with(
            &["a", "b", "c", "d", "e", "f"],
            &[
                ("a", "b", RelationType::HasPart, 2),
                ("c", "b", RelationType::IsPartOf, 1),
                ("d", "c", RelationType::Relation, 4),
                ("e", "f", RelationType::Relation, 2),
                ("f", "missing", RelationType::Relation, 2),
            ],
        );

        ClosureBuilder::new().close(&mut graph);

        let fetched = graph.record_ids();
        for record in graph.records() {
            for target in record.relations.keys().filter(|t| fetched.contains(*t)) {
                let mine: BTreeSet<_> = record
                    .relations
                    .keys()
                    .filter(|t| fetched.contains(*t))
                    .collect();
                let theirs: BTreeSet<_> = graph
                    .relations(target)
                    .unwrap()
                    .keys()
                    .filter(|t| fetched.contains(*t))
                    .collect();
                assert_eq!(mine, theirs, "{} vs {}", record.id, target);
            }
        }
    }

    #[test]
    fn capped_closure_reports_unstable() {
        let mut graph = graph_with(
            &["A", "B", "C", "D"],
            &[
                ("A", "B", RelationType::Relation, 1),
                ("B", "C", RelationType::Relation, 1),
                ("C", "D", RelationType::Relation, 1),
            ],
        );

        let outcome = ClosureBuilder::new().with_max_passes(1).close(&mut graph);
        assert!(!outcome.fixed_point.stable);
        assert_eq!(outcome.fixed_point.passes, 1);
    }

    #[test]
    fn closing_twice_adds_nothing() {
        let mut graph = graph_with(
            &["A", "B", "C"],
            &[
                ("A", "B", RelationType::Relation, 1),
                ("B", "C", RelationType::Relation, 1),
            ],
        );

        ClosureBuilder::new().close(&mut graph);
        let second = ClosureBuilder::new().close(&mut graph);
        assert_eq!(second.inferred, 0);
        assert_eq!(second.fixed_point.passes, 1);
    }
}
