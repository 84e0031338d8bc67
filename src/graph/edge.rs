//! Related-work edges and their relation types

use super::record::RecordId;
use serde::{Deserialize, Serialize};

/// Kind of relation between two works
///
/// An open enumeration: the source may carry types this engine has no
/// special rules for, which are kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationType {
    IsPartOf,
    HasPart,
    Relation,
    Other(String),
}

impl RelationType {
    /// Parse a relation type name as found in source data
    pub fn parse(name: &str) -> Self {
        match name {
            "isPartOf" => Self::IsPartOf,
            "hasPart" => Self::HasPart,
            "relation" => Self::Relation,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::IsPartOf => "isPartOf",
            Self::HasPart => "hasPart",
            Self::Relation => "relation",
            Self::Other(name) => name,
        }
    }

    /// Rank used when sort orders collide: `isPartOf` > `relation` > `hasPart` > anything else
    pub fn priority(&self) -> u8 {
        match self {
            Self::IsPartOf => 3,
            Self::Relation => 2,
            Self::HasPart => 1,
            Self::Other(_) => 0,
        }
    }

    /// Whether an edge of this type displaces `current` as the highest-priority
    /// edge of a collision group.
    ///
    /// Equal known types keep the earlier edge. An unrecognized current holder
    /// is displaced by whatever comes next, including another unrecognized type.
    pub fn outranks(&self, current: &RelationType) -> bool {
        match current {
            Self::Other(_) => true,
            _ => self.priority() > current.priority(),
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RelationType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<RelationType> for String {
    fn from(t: RelationType) -> Self {
        t.as_str().to_string()
    }
}

/// A typed, ordered edge from one record to a related work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedWork {
    /// Kind of relation
    pub relation_type: RelationType,
    /// The related record
    pub target: RecordId,
    /// Rank among the record's relations; positive, unique only after resolution
    pub sort_order: u32,
}

impl RelatedWork {
    pub fn new(target: RecordId, relation_type: RelationType, sort_order: u32) -> Self {
        Self {
            relation_type,
            target,
            sort_order,
        }
    }

    /// The implicit edge every record carries to itself
    pub fn self_edge(id: RecordId) -> Self {
        Self::new(id, RelationType::Relation, 1)
    }

    /// An edge inferred by closure: always generic, order copied from its origin
    pub fn inferred_from(origin: &RelatedWork) -> Self {
        Self::new(origin.target.clone(), RelationType::Relation, origin.sort_order)
    }
}

/// An edge as delivered by a metadata source, before defaults are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    pub target: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
}

impl RawEdge {
    pub fn new(target: impl Into<RecordId>) -> Self {
        Self {
            target: target.into(),
            relation_type: None,
            sort_order: None,
        }
    }

    pub fn with_type(mut self, relation_type: impl Into<String>) -> Self {
        self.relation_type = Some(relation_type.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: u32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    /// Apply defaults: untyped edges are `relation`, unordered edges rank 1
    pub fn into_related(self) -> RelatedWork {
        let relation_type = self
            .relation_type
            .as_deref()
            .map(RelationType::parse)
            .unwrap_or(RelationType::Relation);
        RelatedWork::new(self.target, relation_type, self.sort_order.unwrap_or(1))
    }
}
