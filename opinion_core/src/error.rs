//! Error types for the graph store and dynamics engine.

use crate::entity::EntityId;
use thiserror::Error;

/// Errors surfaced by graph, entity and snapshot operations.
///
/// Lookups that are expected to miss (`EntityStore::get`, `sample_edge` on an
/// edgeless graph) return `Option` instead of one of these.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Operation referenced an id that is not a node of the graph
    #[error("Unknown node: {0}")]
    UnknownNode(EntityId),

    /// Entity id counter exhausted
    #[error("Entity id space exhausted")]
    IdOverflow,

    /// A pinned id was registered while another entity still holds it
    #[error("Entity id already in use: {0}")]
    IdInUse(EntityId),

    /// Snapshot document is missing fields or references unknown nodes
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Snapshot file could not be read or written
    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),
}

impl GraphError {
    /// Creates a malformed snapshot error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedSnapshot(msg.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
