//! Core error types for CodeRelay.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Exit code shells use for "command not found".
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

// ============================================================================
// Core Error
// ============================================================================

/// Core error type for configuration and shared operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unsupported configuration file format.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// ============================================================================
// Failure Context
// ============================================================================

/// Everything a classifier may look at when a provider invocation fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureContext {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// HTTP status, if the tool surfaced one.
    pub http_status: Option<u16>,
}

impl FailureContext {
    /// Creates a context from a failed process exit.
    pub fn from_exit(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            http_status: None,
        }
    }

    /// Creates a context carrying only a message.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            stderr: message.into(),
            ..Default::default()
        }
    }

    /// Attaches an HTTP status.
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// A one-line summary suitable for logs and error histories.
    ///
    /// Prefers the last non-empty stderr line, then stdout, then the exit code.
    pub fn summary(&self) -> String {
        let last_line = |s: &str| {
            s.lines()
                .rev()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(ToString::to_string)
        };

        last_line(&self.stderr)
            .or_else(|| last_line(&self.stdout))
            .unwrap_or_else(|| match (self.http_status, self.exit_code) {
                (Some(status), _) => format!("HTTP {status}"),
                (None, Some(code)) => format!("exited with code {code}"),
                (None, None) => "unknown failure".to_string(),
            })
    }
}

// ============================================================================
// Provider Error
// ============================================================================

/// Error returned by a provider invocation.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The caller cancelled the invocation.
    #[error("Invocation aborted")]
    Aborted,

    /// The invocation exceeded its deadline.
    #[error("Invocation timed out after {0:?}")]
    Timeout(Duration),

    /// Output exceeded the configured ceiling; the process was killed.
    #[error("Output exceeded limit of {limit} bytes")]
    OutputLimit {
        /// The ceiling in bytes.
        limit: usize,
    },

    /// The backing binary could not be found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// The process could not be spawned.
    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    /// The tool ran and reported failure.
    #[error("Provider failed: {}", .0.summary())]
    Failed(FailureContext),

    /// The tool succeeded but its output could not be interpreted.
    #[error("Invalid output: {0}")]
    InvalidOutput(String),
}

impl ProviderError {
    /// Returns true if the caller cancelled the invocation.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Returns true if the invocation timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Builds the context handed to `Provider::classify_error`.
    pub fn failure_context(&self) -> FailureContext {
        match self {
            Self::Failed(ctx) => ctx.clone(),
            Self::NotFound(cmd) => FailureContext {
                stderr: format!("command not found: {cmd}"),
                exit_code: Some(EXIT_COMMAND_NOT_FOUND),
                ..Default::default()
            },
            other => FailureContext::from_message(other.to_string()),
        }
    }

    /// A one-line message suitable for error histories.
    pub fn message(&self) -> String {
        match self {
            Self::Failed(ctx) => ctx.summary(),
            other => other.to_string(),
        }
    }
}
