//! Router error types.

use coderelay_core::ErrorKind;
use thiserror::Error;

use crate::attempt::Attempt;

/// Why a routing attempt produced no response.
#[derive(Debug, Clone, Error)]
pub enum RouteError {
    /// No candidates could be built from the request and configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller cancelled.
    #[error("Routing aborted")]
    Aborted,

    /// A provider judged the request itself unusable; no other provider was
    /// tried.
    #[error("{provider} rejected the request ({kind}): {message}")]
    Rejected {
        /// Provider that rejected the request.
        provider: String,
        /// Request-fatal classification.
        kind: ErrorKind,
        /// Provider's message.
        message: String,
    },

    /// Every candidate was skipped or failed.
    #[error("All providers failed: {}", describe_attempts(.attempts))]
    Exhausted {
        /// One entry per candidate, in order.
        attempts: Vec<Attempt>,
    },
}

impl RouteError {
    /// Returns the classification behind the error, if there is one.
    ///
    /// For exhaustion this is the kind of the last failed candidate.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Rejected { kind, .. } => Some(*kind),
            Self::Exhausted { attempts } => attempts.iter().rev().find_map(|a| a.kind),
            Self::Config(_) | Self::Aborted => None,
        }
    }

    /// Returns the per-candidate record, if the walk got that far.
    pub fn attempts(&self) -> &[Attempt] {
        match self {
            Self::Exhausted { attempts } => attempts,
            _ => &[],
        }
    }
}

fn describe_attempts(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return "no candidates were tried".to_string();
    }
    attempts
        .iter()
        .map(Attempt::describe)
        .collect::<Vec<_>>()
        .join("; ")
}
