//! JSON fixture collaborators for offline runs
//!
//! A fixture document holds source records and target resources side by
//! side. `FixtureSource` serves the records, `FixtureTarget` serves the
//! resources and applies updates to its in-memory copy, which can be written
//! back to disk.

use super::error::{FetchError, GatewayError, SnapshotError};
use super::traits::{FetchedRecord, MetadataSource, TargetGateway, TargetSnapshotProvider};
use crate::graph::{FieldMap, IdentifierMap, RecordId, ResourceId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// A source record inside a fixture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRecord {
    #[serde(flatten)]
    pub record: FetchedRecord,
    /// Simulate a source outage for this record
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unavailable: bool,
}

/// On-disk fixture: `{ "records": {...}, "resources": {...} }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureDocument {
    #[serde(default)]
    pub records: BTreeMap<RecordId, FixtureRecord>,
    #[serde(default)]
    pub resources: BTreeMap<ResourceId, FieldMap>,
}

impl FixtureDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Metadata source backed by fixture records
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    records: BTreeMap<RecordId, FixtureRecord>,
    field_table: Option<BTreeSet<String>>,
}

impl FixtureSource {
    pub fn new(records: BTreeMap<RecordId, FixtureRecord>) -> Self {
        Self {
            records,
            field_table: None,
        }
    }

    /// Only pass through fields listed in `table`
    pub fn with_field_table(mut self, table: Option<BTreeSet<String>>) -> Self {
        self.field_table = table;
        self
    }

    fn validate(&self, id: &RecordId, record: &FetchedRecord) -> Result<(), FetchError> {
        for edge in &record.edges {
            if edge.target.as_str().trim().is_empty() {
                return Err(FetchError::Malformed {
                    record: id.clone(),
                    reason: "related work without a record id".to_string(),
                });
            }
            if edge.sort_order == Some(0) {
                return Err(FetchError::Malformed {
                    record: id.clone(),
                    reason: format!("sort order 0 on relation to {}", edge.target),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataSource for FixtureSource {
    async fn fetch(&self, id: &RecordId) -> Result<FetchedRecord, FetchError> {
        let entry = self
            .records
            .get(id)
            .ok_or_else(|| FetchError::NotFound(id.clone()))?;
        if entry.unavailable {
            return Err(FetchError::Transient(format!("record {} unavailable", id)));
        }
        self.validate(id, &entry.record)?;

        let mut record = entry.record.clone();
        if let Some(table) = &self.field_table {
            record.fields.retain(|name, _| {
                let known = table.contains(name);
                if !known {
                    debug!(record = %id, field = %name, "dropping field missing from field table");
                }
                known
            });
        }
        Ok(record)
    }
}

/// Snapshot provider and gateway backed by fixture resources
#[derive(Debug)]
pub struct FixtureTarget {
    resources: Mutex<BTreeMap<ResourceId, FieldMap>>,
    identifier_field: String,
    record_id_prefix: String,
    read_only: BTreeSet<String>,
}

impl FixtureTarget {
    pub fn new(
        resources: BTreeMap<ResourceId, FieldMap>,
        identifier_field: impl Into<String>,
        record_id_prefix: impl Into<String>,
    ) -> Self {
        Self {
            resources: Mutex::new(resources),
            identifier_field: identifier_field.into(),
            record_id_prefix: record_id_prefix.into(),
            read_only: BTreeSet::new(),
        }
    }

    /// Fields the target refuses to write
    pub fn with_read_only_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.read_only = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Current resource state, including applied updates
    pub fn resources(&self) -> BTreeMap<ResourceId, FieldMap> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ResourceId, FieldMap>> {
        // A poisoned lock still holds a consistent map: each update is one insert
        self.resources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TargetSnapshotProvider for FixtureTarget {
    async fn current_fields(&self) -> Result<BTreeMap<ResourceId, FieldMap>, SnapshotError> {
        Ok(self.resources())
    }

    async fn identifier_map(&self) -> Result<IdentifierMap, SnapshotError> {
        Ok(IdentifierMap::from_snapshot(
            &self.lock(),
            &self.identifier_field,
            &self.record_id_prefix,
        ))
    }
}

#[async_trait]
impl TargetGateway for FixtureTarget {
    async fn update_field(&self, resource: &ResourceId, field: &str, value: &str) -> Result<(), GatewayError> {
        if self.read_only.contains(field) {
            return Err(GatewayError::Rejected(format!("field {} is read-only", field)));
        }
        let mut resources = self.lock();
        let fields = resources
            .get_mut(resource)
            .ok_or_else(|| GatewayError::UnknownResource(resource.clone()))?;
        fields.insert(field.to_string(), value.to_string());
        Ok(())
    }
}
