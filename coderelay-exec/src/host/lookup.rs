//! Binary lookup on PATH.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Resolves a binary name to an executable path.
#[async_trait]
pub trait BinaryLookup: Send + Sync {
    /// Returns the resolved path, or `None` when the binary is unreachable.
    async fn find(&self, binary: &str) -> Option<PathBuf>;
}

/// Looks binaries up on `PATH` via `which`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLookup;

impl PathLookup {
    /// Creates a new lookup.
    pub fn new() -> Self {
        Self
    }

    /// Find the path to a command, blocking.
    pub fn which(cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }

    /// Find all instances of a command on PATH.
    pub fn which_all(cmd: &str) -> Vec<PathBuf> {
        which::which_all(cmd)
            .map(Iterator::collect)
            .unwrap_or_default()
    }
}

#[async_trait]
impl BinaryLookup for PathLookup {
    async fn find(&self, binary: &str) -> Option<PathBuf> {
        let name = binary.to_string();
        // `which` stats every PATH entry; keep that off the async workers.
        let found = tokio::task::spawn_blocking(move || Self::which(&name))
            .await
            .ok()
            .flatten();
        debug!(binary = %binary, found = found.is_some(), "Binary lookup");
        found
    }
}
