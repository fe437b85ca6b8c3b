//! Error types for the runtime crate.

use otto_persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur while driving agents.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No unread prompt is addressed to the agent.
    #[error("no pending prompt for agent {agent_id}")]
    NoPromptFound { agent_id: String },

    /// No adapter is registered for the agent's type.
    #[error("unknown agent type: {0}")]
    UnknownAgentType(String),

    /// The vendor binary is not on PATH.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// The process could not be started.
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Store failure, lookup miss or rejected status change.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Releasing the process failed.
    #[error("cleanup failed: {0}")]
    Cleanup(String),
}

impl RuntimeError {
    /// Returns true if the error is a lifecycle violation.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            RuntimeError::Persistence(PersistenceError::InvalidTransition { .. })
        )
    }

    /// Returns true if the error is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::Persistence(e) if e.is_not_found())
    }
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
