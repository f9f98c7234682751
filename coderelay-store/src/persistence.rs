//! State file I/O.
//!
//! A save writes the whole document to a sibling temp file, owner-only from
//! the moment it is created, and renames it over the target. Readers see
//! either the previous document or the new one.

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StoreError;

/// Distinguishes temp files of concurrent saves within one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/CodeRelay`
/// - Linux: `~/.config/coderelay`
/// - Windows: `%APPDATA%\coderelay`
pub fn default_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support").join("CodeRelay"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir()
            .map(|c| c.join("coderelay"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Returns the default data directory, where provider state lives.
///
/// - macOS: `~/Library/Application Support/CodeRelay`
/// - Linux: `~/.local/share/coderelay`
/// - Windows: `%APPDATA%\coderelay\data`
pub fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        default_config_dir()
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::data_dir()
            .map(|d| d.join("coderelay"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Returns the default config file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

/// Returns the default provider state file path.
pub fn default_state_path() -> PathBuf {
    default_data_dir().join("state.json")
}

// ============================================================================
// Saving
// ============================================================================

/// Returns a temp path next to `path` that no other save in this process
/// is using.
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "state".into(), |n| n.to_string_lossy().into_owned());
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

/// Creates missing parent directories, owner-only on Unix.
async fn create_parent_dirs(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if tokio::fs::try_exists(parent).await? {
        return Ok(());
    }

    debug!(path = %parent.display(), "Creating state directory");
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder.create(parent).await?;
    Ok(())
}

/// Writes `contents` to a new file that is 0600 on Unix from creation.
async fn write_private(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    Ok(())
}

/// Saves a document as pretty JSON, atomically.
///
/// Once the rename succeeds nothing else can fail, so an `Ok` means the
/// data landed and an `Err` means the previous document is untouched.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(data)?;
    create_parent_dirs(path).await?;

    let temp = temp_path_for(path);
    let written = match write_private(&temp, &json).await {
        Ok(()) => tokio::fs::rename(&temp, path).await.map_err(StoreError::from),
        Err(e) => Err(e),
    };
    if written.is_err() {
        // The temp file may or may not exist at this point.
        let _ = tokio::fs::remove_file(&temp).await;
    }
    written?;

    debug!(path = %path.display(), bytes = json.len(), "State document written");
    Ok(())
}

// ============================================================================
// Loading
// ============================================================================

/// Loads a JSON document.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read(path).await?;
    let data = serde_json::from_slice(&content)?;
    debug!(path = %path.display(), bytes = content.len(), "State document read");
    Ok(data)
}

// ============================================================================
// Tests
// ============================================================================
