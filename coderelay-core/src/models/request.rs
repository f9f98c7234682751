//! Coding request types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Mode used when a request does not name one.
pub const DEFAULT_MODE: &str = "general";

// ============================================================================
// Coding Request
// ============================================================================

/// A single coding request to route to a provider.
///
/// Requests are immutable once handed to the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingRequest {
    /// The prompt text.
    pub prompt: String,
    /// Task mode (e.g. `general`, `review`, `refactor`).
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Explicit provider id; bypasses the configured order.
    #[serde(default)]
    pub provider: Option<String>,
    /// Files to hand to the provider as context.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Optional generation parameters.
    #[serde(default)]
    pub params: GenerationParams,
}

fn default_mode() -> String {
    DEFAULT_MODE.to_string()
}

impl CodingRequest {
    /// Creates a request in the default mode.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            mode: default_mode(),
            provider: None,
            files: Vec::new(),
            params: GenerationParams::default(),
        }
    }

    /// Sets the task mode.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Pins the request to one provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Adds a context file.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Sets the model parameter.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.params.model = Some(model.into());
        self
    }
}

// ============================================================================
// Generation Parameters
// ============================================================================

/// Optional model tuning parameters.
///
/// Providers ignore what their tool cannot express.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    /// Model name override.
    pub model: Option<String>,
    /// Maximum output tokens.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let request = CodingRequest::new("fix the bug");
        assert_eq!(request.mode, DEFAULT_MODE);
        assert!(request.provider.is_none());
        assert!(request.files.is_empty());
    }

    #[test]
    fn test_deserialize_without_mode() {
        let request: CodingRequest = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert_eq!(request.mode, "general");
        assert_eq!(request.params, GenerationParams::default());
    }
}
