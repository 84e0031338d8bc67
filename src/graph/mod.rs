//! Core record graph data structures

mod edge;
mod identifiers;
mod record;
mod relations;


pub use edge::{RawEdge, RelatedWork, RelationType};
pub use identifiers::{clean_object_number, IdentifierMap};
pub use record::{FieldMap, Record, RecordId, RelationSet, ResourceId};
pub use relations::{GraphError, GraphResult, RelationGraph};
