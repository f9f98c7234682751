//! Store error types.

use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The state document was written by a newer version.
    #[error("Unsupported state version {found} (expected at most {supported})")]
    UnsupportedVersion {
        /// Version found on disk.
        found: u32,
        /// Highest version this build understands.
        supported: u32,
    },
}

impl StoreError {
    /// Returns true if the file simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
