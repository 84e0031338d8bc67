//! Records and the identifiers that tie them to target resources

use super::edge::RelatedWork;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name to value, as fetched from the source or stored in the target.
///
/// Ordered so that update plans and reports come out in a stable order.
pub type FieldMap = BTreeMap<String, String>;

/// Identifier of a record in the source record system
///
/// Ordering is plain lexicographic on the underlying string; relation sets
/// rely on it for their deterministic starting order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a resource in the target asset-management system
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Relation set of one record, keyed by target record.
///
/// Keying by target enforces the one-edge-per-target invariant.
pub type RelationSet = BTreeMap<RecordId, RelatedWork>;

/// A fetched catalog record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Source identifier
    pub id: RecordId,
    /// Fetched field values
    pub fields: FieldMap,
    /// Outgoing related-work edges, self-edge included
    pub relations: RelationSet,
}

impl Record {
    /// Create a record holding only its implicit self-edge
    pub fn new(id: RecordId) -> Self {
        let mut relations = RelationSet::new();
        relations.insert(id.clone(), RelatedWork::self_edge(id.clone()));
        Self {
            id,
            fields: FieldMap::new(),
            relations,
        }
    }

    /// Whether this record has an edge to `target`
    pub fn relates_to(&self, target: &RecordId) -> bool {
        self.relations.contains_key(target)
    }
}
