//! Provider description types.
//!
//! - [`Capability`] - What a provider's tool can do
//! - [`ProviderInfo`] - Static description reported by `Provider::info`

use serde::{Deserialize, Serialize};

// ============================================================================
// Capability
// ============================================================================

/// A capability advertised by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Free-form code generation.
    Generate,
    /// Reviewing existing code.
    Review,
    /// Multi-file edits in a working directory.
    Edit,
    /// Accepts context files.
    Files,
    /// Emits incremental output.
    Streaming,
    /// Emits machine-readable JSON.
    Json,
}

impl Capability {
    /// Returns the display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Review => "review",
            Self::Edit => "edit",
            Self::Files => "files",
            Self::Streaming => "streaming",
            Self::Json => "json",
        }
    }
}

// ============================================================================
// Provider Info
// ============================================================================

/// Static provider description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Provider id (`claude`, `codex`, ...).
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Backing binary name or path.
    pub binary: String,
    /// Whether `run_stream` emits real deltas.
    pub supports_streaming: bool,
    /// Whether the tool is asked for JSON output.
    pub prefers_json: bool,
    /// Advertised capabilities.
    pub capabilities: Vec<Capability>,
}
