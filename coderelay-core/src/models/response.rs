//! Provider responses and streaming events.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

// ============================================================================
// Usage
// ============================================================================

/// Token usage reported by a provider, when the tool exposes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Prompt tokens.
    pub input_tokens: u64,
    /// Completion tokens.
    pub output_tokens: u64,
    /// Tokens served from cache, if reported.
    #[serde(default)]
    pub cached_tokens: u64,
}

impl Usage {
    /// Total tokens consumed.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Tokens offloaded to the provider instead of the calling model.
    ///
    /// This is what the state tracker accumulates as "tokens saved".
    pub fn tokens_saved(&self) -> u64 {
        self.total()
    }
}

// ============================================================================
// Provider Response
// ============================================================================

/// Final result of one provider invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    /// Provider id that produced the text.
    pub provider: String,
    /// Response text.
    pub text: String,
    /// Token usage, if the tool reported it.
    pub usage: Option<Usage>,
}

impl ProviderResponse {
    /// Creates a response without usage data.
    pub fn new(provider: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            text: text.into(),
            usage: None,
        }
    }

    /// Attaches usage data.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Tokens saved by this response (zero without usage data).
    pub fn tokens_saved(&self) -> u64 {
        self.usage.map_or(0, |u| u.tokens_saved())
    }
}

// ============================================================================
// Provider Events
// ============================================================================

/// One event of a streaming provider invocation.
///
/// A well-formed stream is exactly one `Start`, any number of `TextDelta` or
/// `Chunk`, then exactly one terminal `Complete` or `Error`.
#[derive(Debug)]
pub enum ProviderEvent {
    /// The subprocess has been started.
    Start {
        /// Provider id.
        provider: String,
    },
    /// Incremental response text.
    TextDelta(String),
    /// A structured chunk (e.g. one JSON line of tool output).
    Chunk(serde_json::Value),
    /// Terminal success.
    Complete(ProviderResponse),
    /// Terminal failure.
    Error(ProviderError),
}

impl ProviderEvent {
    /// Returns true for `Complete` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error(_))
    }
}
