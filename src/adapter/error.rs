//! Errors reported by external collaborators

use crate::graph::{RecordId, ResourceId};
use thiserror::Error;

/// Why a record could not be fetched from the metadata source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The source has no such record
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Network trouble or timeout; the call may succeed if retried
    #[error("transient source failure: {0}")]
    Transient(String),

    /// The source answered but the payload is unusable
    #[error("malformed record {record}: {reason}")]
    Malformed { record: RecordId, reason: String },
}

impl FetchError {
    /// Whether a retry could help
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Not found and transient failures only skip the record
    pub fn is_skippable(&self) -> bool {
        !self.is_malformed()
    }
}

/// Failure of a single field update at the target
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The target refused the value
    #[error("update rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unknown resource: {0}")]
    UnknownResource(ResourceId),
}

/// The target's current state could not be read
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
