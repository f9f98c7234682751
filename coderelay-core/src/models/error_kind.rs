//! The closed provider failure taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Error Kind
// ============================================================================

/// Classification of a provider failure.
///
/// The kind alone decides what the router does next:
/// - request-fatal kinds abort the whole routing attempt,
/// - credit kinds put the provider into cooldown and continue,
/// - everything else continues without cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Account has run out of credits or quota.
    OutOfCredits,
    /// Too many requests in the current window.
    RateLimit,
    /// The request itself was malformed.
    BadRequest,
    /// Missing or invalid credentials.
    Unauthorized,
    /// Credentials valid but access denied.
    Forbidden,
    /// Binary, model, or resource not found.
    NotFound,
    /// Invocation exceeded its deadline.
    Timeout,
    /// Prompt plus context too large for the model.
    ContextLength,
    /// Output or input blocked by a safety filter.
    ContentFilter,
    /// Provider-side server error.
    Internal,
    /// Network blip or otherwise retryable condition.
    Transient,
    /// No classification possible.
    Unknown,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 12] = [
        Self::OutOfCredits,
        Self::RateLimit,
        Self::BadRequest,
        Self::Unauthorized,
        Self::Forbidden,
        Self::NotFound,
        Self::Timeout,
        Self::ContextLength,
        Self::ContentFilter,
        Self::Internal,
        Self::Transient,
        Self::Unknown,
    ];

    /// Returns the wire name (`OUT_OF_CREDITS`, `RATE_LIMIT`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfCredits => "OUT_OF_CREDITS",
            Self::RateLimit => "RATE_LIMIT",
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::ContextLength => "CONTEXT_LENGTH",
            Self::ContentFilter => "CONTENT_FILTER",
            Self::Internal => "INTERNAL",
            Self::Transient => "TRANSIENT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Returns true if the request is unusable and no other provider should be tried.
    pub fn is_request_fatal(&self) -> bool {
        matches!(
            self,
            Self::BadRequest
                | Self::Unauthorized
                | Self::Forbidden
                | Self::ContextLength
                | Self::ContentFilter
        )
    }

    /// Returns true if the provider should be put into cooldown.
    pub fn triggers_cooldown(&self) -> bool {
        matches!(self, Self::OutOfCredits | Self::RateLimit)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("unknown error kind: {s}"))
    }
}
