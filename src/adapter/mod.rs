//! Collaborator layer
//!
//! The engine talks to the outside world through three traits: a metadata
//! source, a target snapshot provider and a target gateway. JSON fixture
//! implementations back the command-line tool and the tests.

mod cancel;
mod error;
pub mod fixture;
mod traits;

pub use cancel::CancellationToken;
pub use error::{FetchError, GatewayError, SnapshotError};
pub use fixture::{FixtureDocument, FixtureRecord, FixtureSource, FixtureTarget};
pub use traits::{FetchedRecord, MetadataSource, TargetGateway, TargetSnapshotProvider};
