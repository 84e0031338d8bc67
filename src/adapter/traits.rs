//! Collaborator traits: the narrow seams between the engine and the systems it syncs
//!
//! The engine never speaks a wire protocol itself. A metadata source hands it
//! records, a snapshot provider hands it the target's current state, and a
//! gateway takes field updates back to the target.

use super::error::{FetchError, GatewayError, SnapshotError};
use crate::graph::{FieldMap, IdentifierMap, RawEdge, RecordId, ResourceId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One record as delivered by a metadata source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedRecord {
    /// Field values, already mapped to target field names
    #[serde(default)]
    pub fields: FieldMap,
    /// Related works in source order
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

impl FetchedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_edge(mut self, edge: RawEdge) -> Self {
        self.edges.push(edge);
        self
    }
}

/// Where records come from.
///
/// Implementations must keep each call bounded; the engine adds its own
/// timeout and retries `FetchError::Transient` failures.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, record: &RecordId) -> Result<FetchedRecord, FetchError>;
}

/// Read-only view of the target, loaded once at the start of a run
#[async_trait]
pub trait TargetSnapshotProvider: Send + Sync {
    /// Current stored fields of every resource
    async fn current_fields(&self) -> Result<BTreeMap<ResourceId, FieldMap>, SnapshotError>;

    /// Which record each resource mirrors
    async fn identifier_map(&self) -> Result<IdentifierMap, SnapshotError>;
}

/// Write path to the target, one field at a time
#[async_trait]
pub trait TargetGateway: Send + Sync {
    async fn update_field(
        &self,
        resource: &ResourceId,
        field: &str,
        value: &str,
    ) -> Result<(), GatewayError>;
}
