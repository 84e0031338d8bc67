//! Catalog Reconcile: relation closure and field reconciliation
//!
//! Keeps a target asset system in step with a catalog record source. Records
//! are fetched from the source, expanded through their related works, closed
//! so that related records agree on their relation sets, ordered without
//! collisions, and finally diffed field by field against the target.
//!
//! # Core Concepts
//!
//! - **Records**: fetched catalog entries with fields and related-work edges
//! - **Resources**: target-side mirrors of records, mapped by object number
//! - **Runs**: one pass of expansion, closure, ordering and reconciliation
//!
//! # Example
//!
//! ```
//! use catalog_reconcile::{RelationGraph, RecordId};
//!
//! let mut graph = RelationGraph::new();
//! graph.add_record(RecordId::from("R1"));
//! assert_eq!(graph.edge_count(), 1);
//! ```

pub mod adapter;
pub mod config;
mod graph;
pub mod reconcile;
pub mod resolve;
pub mod run;

pub use adapter::{
    CancellationToken, FetchError, FetchedRecord, FixtureDocument, FixtureRecord, FixtureSource,
    FixtureTarget, GatewayError, MetadataSource, SnapshotError, TargetGateway,
    TargetSnapshotProvider,
};
pub use config::{ConfigError, RunConfig};
pub use graph::{
    clean_object_number, FieldMap, GraphError, GraphResult, IdentifierMap, RawEdge, Record,
    RecordId, RelatedWork, RelationGraph, RelationSet, RelationType, ResourceId,
};
pub use reconcile::{FieldReconciler, ResourceReport, RunSummary};
pub use resolve::{ClosureBuilder, FixedPoint, SortOrderResolver};
pub use run::{ReconciliationRun, RunError, RunOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
