//! Shared fixtures and collaborators for reconciliation integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use catalog_reconcile::{
    FetchError, FetchedRecord, FixtureDocument, FixtureSource, FixtureTarget, MetadataSource,
    RawEdge, ReconciliationRun, RecordId, ResourceId, RunConfig,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Three panels of a triptych, a record related to an unmapped work, and a
/// record related to a work the source does not have.
///
/// | resource | record | notes                                   |
/// |----------|--------|-----------------------------------------|
/// | 101      | R1     | hasPart R2; stale title, extra keywords |
/// | 102      | R2     | hasPart R3; no fields on the target     |
/// | 103      | R3     | title already current                   |
/// | 104      | R4     | relates to R9, which has no resource    |
/// | 105      | R5     | relates to R8, missing from the source  |
/// | 106      | R6     | missing from the source                 |
pub fn triptych() -> FixtureDocument {
    serde_json::from_value(json!({
        "records": {
            "R1": {
                "fields": {
                    "title": "Triptych",
                    "keywords": "altarpiece, oak",
                    "earliestdate": "1430",
                    "latestdate": "1440"
                },
                "edges": [ { "target": "R2", "relation_type": "hasPart", "sort_order": 2 } ]
            },
            "R2": {
                "fields": { "title": "Left wing", "inscription": "AALS IXH XAN" },
                "edges": [ { "target": "R3", "relation_type": "hasPart", "sort_order": 2 } ]
            },
            "R3": { "fields": { "title": "Right wing" } },
            "R4": { "edges": [ { "target": "R9" } ] },
            "R5": { "edges": [ { "target": "R8" } ] },
            "R9": { "fields": { "title": "Study" } }
        },
        "resources": {
            "101": {
                "sourceinvnr": "R1",
                "title": "Triptych (old)",
                "keywords": "altarpiece, oak, gilded"
            },
            "102": { "sourceinvnr": "R2" },
            "103": { "sourceinvnr": "R3", "title": "Right wing" },
            "104": { "sourceinvnr": "R4" },
            "105": { "sourceinvnr": "R5" },
            "106": { "sourceinvnr": "R6" }
        }
    }))
    .expect("valid fixture")
}

pub fn target_for(document: &FixtureDocument, config: &RunConfig) -> Arc<FixtureTarget> {
    Arc::new(FixtureTarget::new(
        document.resources.clone(),
        config.identifier_field.clone(),
        config.record_id_prefix.clone(),
    ))
}

pub fn source_for(document: &FixtureDocument, config: &RunConfig) -> Arc<FixtureSource> {
    Arc::new(FixtureSource::new(document.records.clone()).with_field_table(config.field_table()))
}

/// A run over `document`'s records against an existing target
pub fn run_against(
    document: &FixtureDocument,
    target: &Arc<FixtureTarget>,
    config: RunConfig,
) -> ReconciliationRun {
    ReconciliationRun::new(
        source_for(document, &config),
        target.clone(),
        target.clone(),
        config,
    )
}

/// Stored value of one field on the target
pub fn stored(target: &FixtureTarget, resource: &str, field: &str) -> Option<String> {
    target
        .resources()
        .get(&ResourceId::from(resource))
        .and_then(|fields| fields.get(field).cloned())
}

pub fn ids(values: &[&str]) -> Vec<RecordId> {
    values.iter().map(|s| RecordId::from(*s)).collect()
}

/// Source where record `n` relates to `n + 1` without end
#[derive(Default)]
pub struct EndlessSource {
    pub fetched: Mutex<Vec<RecordId>>,
}

#[async_trait]
impl MetadataSource for EndlessSource {
    async fn fetch(&self, id: &RecordId) -> Result<FetchedRecord, FetchError> {
        self.fetched.lock().unwrap().push(id.clone());
        let n: u64 = id.as_str().parse().map_err(|_| FetchError::Malformed {
            record: id.clone(),
            reason: "expected a numeric id".into(),
        })?;
        Ok(FetchedRecord::new()
            .with_field("title", format!("Work {}", n))
            .with_edge(RawEdge::new((n + 1).to_string())))
    }
}
