//! Collision-free ordering of relation sets

use super::FixedPoint;
use crate::graph::{IdentifierMap, RecordId, RelatedWork, RelationGraph, RelationSet};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Final, ordered relations of every record in a graph
#[derive(Debug, Clone, Default)]
pub struct SortOutcome {
    /// Relations per record, ascending by resolved sort order
    pub orders: BTreeMap<RecordId, Vec<RelatedWork>>,
    /// Records whose resolution hit the pass cap
    pub unstable: Vec<RecordId>,
}

/// Resolves sort-order collisions and renders the related-records field
#[derive(Debug, Clone, Copy, Default)]
pub struct SortOrderResolver;

impl SortOrderResolver {
    /// Order one relation set.
    ///
    /// Edges start in ascending target order (so records sharing members agree
    /// on tie handling). While two edges share a sort order, the edge of that
    /// order with the highest relation-type priority keeps it and every other
    /// edge at or above it moves up by one.
    pub fn resolve(relations: &RelationSet) -> (Vec<RelatedWork>, FixedPoint) {
        let mut edges: Vec<RelatedWork> = relations.values().cloned().collect();
        if edges.len() <= 1 {
            return (edges, FixedPoint::settled());
        }

        rebase_if_crowded(&mut edges);

        // Each pass removes exactly one duplicate, so n passes always suffice
        let max_passes = edges.len() + 1;
        let fixed_point = FixedPoint::iterate(max_passes, || separate_first_collision(&mut edges));

        edges.sort_by_key(|edge| edge.sort_order);
        (edges, fixed_point)
    }

    /// Resolve every record of `graph`, writing the new sort orders back
    pub fn resolve_graph(graph: &mut RelationGraph) -> SortOutcome {
        let mut outcome = SortOutcome::default();

        for record in graph.records_mut() {
            let (ordered, fixed_point) = Self::resolve(&record.relations);
            if !fixed_point.stable {
                warn!(record = %record.id, passes = fixed_point.passes, "sort order resolution did not settle");
                outcome.unstable.push(record.id.clone());
            }
            for edge in &ordered {
                if let Some(stored) = record.relations.get_mut(&edge.target) {
                    stored.sort_order = edge.sort_order;
                }
            }
            outcome.orders.insert(record.id.clone(), ordered);
        }

        outcome
    }

    /// Render ordered relations as the target's related-records field.
    ///
    /// Relations without a target counterpart are left out.
    pub fn materialize(ordered: &[RelatedWork], identifiers: &IdentifierMap, separator: &str) -> String {
        ordered
            .iter()
            .filter_map(|edge| identifiers.resource_for(&edge.target))
            .map(|resource| resource.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Fix the first collision found in scan order. Returns false if none remain.
fn separate_first_collision(edges: &mut [RelatedWork]) -> bool {
    let Some(order) = first_collision(edges) else {
        return false;
    };

    let mut highest: Option<usize> = None;
    for (i, edge) in edges.iter().enumerate() {
        if edge.sort_order != order {
            continue;
        }
        match highest {
            Some(h) if !edge.relation_type.outranks(&edges[h].relation_type) => {}
            _ => highest = Some(i),
        }
    }

    for (i, edge) in edges.iter_mut().enumerate() {
        if Some(i) != highest && edge.sort_order >= order {
            edge.sort_order = edge.sort_order.saturating_add(1);
        }
    }
    true
}

/// Renumber sort orders densely from 1 when shifting could pass `u32::MAX`.
///
/// Resolution raises any order by at most the edge count, so that much
/// headroom above the highest order is required. Equal orders stay equal and
/// relative order is kept, so the resolved ordering is unchanged.
fn rebase_if_crowded(edges: &mut [RelatedWork]) {
    let headroom = u32::try_from(edges.len()).unwrap_or(u32::MAX);
    let highest = edges.iter().map(|edge| edge.sort_order).max().unwrap_or(0);
    if highest.checked_add(headroom).is_some() {
        return;
    }

    let ranks: BTreeMap<u32, u32> = edges
        .iter()
        .map(|edge| edge.sort_order)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .zip(1..)
        .collect();
    for edge in edges.iter_mut() {
        if let Some(rank) = ranks.get(&edge.sort_order) {
            edge.sort_order = *rank;
        }
    }
    debug!(highest, edges = edges.len(), "rebased sort orders near the u32 limit");
}

/// Sort order of the first edge (in scan order) that shares its value
fn first_collision(edges: &[RelatedWork]) -> Option<u32> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for edge in edges {
        *counts.entry(edge.sort_order).or_default() += 1;
    }
    edges
        .iter()
        .map(|edge| edge.sort_order)
        .find(|order| counts.get(order).copied().unwrap_or(0) > 1)
}
