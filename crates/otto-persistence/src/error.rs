//! Error types for persistence operations.

use std::path::PathBuf;
use thiserror::Error;

use otto_models::AgentStatus;

/// Errors that can occur during persistence operations.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Item not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Item with the same primary key already exists.
    #[error("{kind} already exists: {id}")]
    Duplicate { kind: String, id: String },

    /// Agent status change rejected by the lifecycle state machine.
    #[error("invalid transition for agent {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: AgentStatus,
        to: AgentStatus,
    },

    /// Identifier allocation gave up after repeated collisions.
    #[error("could not allocate {kind} identifier after {attempts} attempts")]
    IdentifierExhausted { kind: String, attempts: usize },

    /// Underlying LMDB failure.
    #[error("storage error: {0}")]
    Storage(#[from] heed::Error),

    /// Failed to serialize or deserialize a row.
    #[error("failed to serialize: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Failed to create the store directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl PersistenceError {
    pub(crate) fn not_found(kind: &str, id: impl Into<String>) -> Self {
        PersistenceError::NotFound {
            kind: kind.to_string(),
            id: id.into(),
        }
    }

    pub(crate) fn duplicate(kind: &str, id: impl Into<String>) -> Self {
        PersistenceError::Duplicate {
            kind: kind.to_string(),
            id: id.into(),
        }
    }

    /// Returns true for lookup misses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistenceError::NotFound { .. })
    }

    /// Returns true for failures of the store itself (including constraint
    /// violations), as opposed to lifecycle or lookup errors.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            PersistenceError::Duplicate { .. }
                | PersistenceError::Storage(_)
                | PersistenceError::SerializeError(_)
                | PersistenceError::DirectoryError { .. }
                | PersistenceError::InvalidData(_)
        )
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
