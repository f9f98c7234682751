//! Process execution error types.

use coderelay_core::ProviderError;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Process Error
// ============================================================================

/// Error type for process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// The process could not be started.
    #[error("Failed to spawn {program}: {reason}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying reason.
        reason: String,
    },

    /// The caller cancelled; the child was killed.
    #[error("Command cancelled")]
    Cancelled,

    /// Command timed out; the child was killed.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Output exceeded the ceiling; the child was killed.
    #[error("Output exceeded limit of {limit} bytes")]
    OutputLimit {
        /// The ceiling in bytes.
        limit: usize,
    },

    /// IO error while talking to the child.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProcessError> for ProviderError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NotFound(cmd) => ProviderError::NotFound(cmd),
            ProcessError::Cancelled => ProviderError::Aborted,
            ProcessError::Timeout(after) => ProviderError::Timeout(after),
            ProcessError::OutputLimit { limit } => ProviderError::OutputLimit { limit },
            other @ (ProcessError::Spawn { .. } | ProcessError::Io(_)) => {
                ProviderError::Spawn(other.to_string())
            }
        }
    }
}
