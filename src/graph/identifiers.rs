//! Correlation of source records with target resources

use super::record::{FieldMap, RecordId, ResourceId};
use std::collections::BTreeMap;
use tracing::debug;

/// `recordId → resourceId` table, built once per run from the target snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMap {
    by_record: BTreeMap<RecordId, ResourceId>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the table from the target's stored fields.
    ///
    /// Each resource carrying a non-blank `identifier_field` maps to the record
    /// `prefix + cleaned object number`. When two resources claim the same
    /// record, the later one (in resource order) wins.
    pub fn from_snapshot(
        snapshot: &BTreeMap<ResourceId, FieldMap>,
        identifier_field: &str,
        prefix: &str,
    ) -> Self {
        let mut map = Self::new();
        for (resource, fields) in snapshot {
            let Some(raw) = fields.get(identifier_field) else {
                continue;
            };
            let object_number = clean_object_number(raw);
            if object_number.is_empty() {
                continue;
            }
            let record = RecordId::new(format!("{}{}", prefix, object_number));
            if let Some(previous) = map.insert(record.clone(), resource.clone()) {
                debug!(%record, %previous, %resource, "record claimed by more than one resource");
            }
        }
        map
    }

    /// Map a record to a resource, returning the previous mapping if any
    pub fn insert(&mut self, record: RecordId, resource: ResourceId) -> Option<ResourceId> {
        self.by_record.insert(record, resource)
    }

    pub fn resource_for(&self, record: &RecordId) -> Option<&ResourceId> {
        self.by_record.get(record)
    }

    /// Reverse lookup, used to seed single-resource runs
    pub fn record_for(&self, resource: &ResourceId) -> Option<&RecordId> {
        self.by_record
            .iter()
            .find(|(_, r)| *r == resource)
            .map(|(record, _)| record)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &ResourceId)> {
        self.by_record.iter()
    }

    pub fn len(&self) -> usize {
        self.by_record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_record.is_empty()
    }
}

impl FromIterator<(RecordId, ResourceId)> for IdentifierMap {
    fn from_iter<T: IntoIterator<Item = (RecordId, ResourceId)>>(iter: T) -> Self {
        Self {
            by_record: iter.into_iter().collect(),
        }
    }
}

/// Normalize an object number as typed into the target system: trim it and
/// collapse inner whitespace runs to a single space.
pub fn clean_object_number(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
