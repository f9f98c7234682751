//! Per-candidate records and the routing result.

use coderelay_core::{ErrorKind, Usage};
use std::time::Duration;

// ============================================================================
// Attempt
// ============================================================================

/// Record of one candidate considered during a routing walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// The provider id.
    pub provider: String,
    /// Whether the provider produced the response.
    pub success: bool,
    /// Whether the provider was passed over without being invoked.
    pub skipped: bool,
    /// Classification of the failure or skip.
    pub kind: Option<ErrorKind>,
    /// Failure or skip reason.
    pub error: Option<String>,
    /// Time spent on this candidate.
    pub duration: Duration,
}

impl Attempt {
    /// Creates a successful attempt record.
    pub fn success(provider: impl Into<String>, duration: Duration) -> Self {
        Self {
            provider: provider.into(),
            success: true,
            skipped: false,
            kind: None,
            error: None,
            duration,
        }
    }

    /// Creates a failed attempt record.
    pub fn failure(
        provider: impl Into<String>,
        kind: ErrorKind,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            provider: provider.into(),
            success: false,
            skipped: false,
            kind: Some(kind),
            error: Some(error.into()),
            duration,
        }
    }

    /// Creates a record for a candidate that was never invoked.
    pub fn skipped(provider: impl Into<String>, kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            skipped: true,
            ..Self::failure(provider, kind, reason, Duration::ZERO)
        }
    }

    /// `"id (KIND: message)"`, or `"id (ok)"`.
    pub fn describe(&self) -> String {
        match (self.kind, &self.error) {
            (Some(kind), Some(error)) => format!("{} ({kind}: {error})", self.provider),
            (Some(kind), None) => format!("{} ({kind})", self.provider),
            _ => format!("{} (ok)", self.provider),
        }
    }
}

// ============================================================================
// Route Response
// ============================================================================

/// A successful routing result.
#[derive(Debug, Clone)]
pub struct RouteResponse {
    /// Provider that answered.
    pub provider: String,
    /// Response text.
    pub text: String,
    /// Token usage, if the provider reported it.
    pub usage: Option<Usage>,
    /// Every candidate considered, the winner last.
    pub attempts: Vec<Attempt>,
    /// Total time across all candidates.
    pub duration: Duration,
}

impl RouteResponse {
    /// Returns the number of candidates considered.
    pub fn attempts_count(&self) -> usize {
        self.attempts.len()
    }

    /// Returns the failures and skips that preceded the winner.
    pub fn failovers(&self) -> impl Iterator<Item = &Attempt> {
        self.attempts.iter().filter(|a| !a.success)
    }
}
