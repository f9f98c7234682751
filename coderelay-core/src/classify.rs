//! Failure classification.
//!
//! Turns a [`FailureContext`] into an [`ErrorKind`]:
//!
//! 1. An HTTP status, when present, decides first.
//! 2. Otherwise the combined stderr/stdout text is matched case-insensitively
//!    against an ordered substring table. Provider-specific patterns come
//!    before the generic defaults and the first match wins.
//! 3. Exit code 127 means the command was not found.
//! 4. Anything else is `TRANSIENT`, unless the table is empty, in which case
//!    the classifier has no opinion and returns `UNKNOWN`.

use serde::{Deserialize, Serialize};

use crate::error::{EXIT_COMMAND_NOT_FOUND, FailureContext};
use crate::models::ErrorKind;

// ============================================================================
// Default Pattern Table
// ============================================================================

/// Generic patterns shared by every provider, in match order.
///
/// Context-length phrases sit before bad-request phrases because tools often
/// report an oversized prompt as an invalid request.
const DEFAULT_PATTERNS: &[(&str, ErrorKind)] = &[
    ("context length", ErrorKind::ContextLength),
    ("context_length_exceeded", ErrorKind::ContextLength),
    ("context window", ErrorKind::ContextLength),
    ("maximum context", ErrorKind::ContextLength),
    ("prompt is too long", ErrorKind::ContextLength),
    ("too many tokens", ErrorKind::ContextLength),
    ("content filter", ErrorKind::ContentFilter),
    ("content_filter", ErrorKind::ContentFilter),
    ("content policy", ErrorKind::ContentFilter),
    ("blocked by safety", ErrorKind::ContentFilter),
    ("out of credits", ErrorKind::OutOfCredits),
    ("insufficient credits", ErrorKind::OutOfCredits),
    ("insufficient_quota", ErrorKind::OutOfCredits),
    ("quota exceeded", ErrorKind::OutOfCredits),
    ("credit balance", ErrorKind::OutOfCredits),
    ("usage limit", ErrorKind::OutOfCredits),
    ("rate limit", ErrorKind::RateLimit),
    ("rate_limit", ErrorKind::RateLimit),
    ("ratelimit", ErrorKind::RateLimit),
    ("too many requests", ErrorKind::RateLimit),
    ("resource_exhausted", ErrorKind::RateLimit),
    ("unauthorized", ErrorKind::Unauthorized),
    ("invalid api key", ErrorKind::Unauthorized),
    ("invalid_api_key", ErrorKind::Unauthorized),
    ("api key not valid", ErrorKind::Unauthorized),
    ("authentication", ErrorKind::Unauthorized),
    ("not logged in", ErrorKind::Unauthorized),
    ("login required", ErrorKind::Unauthorized),
    ("forbidden", ErrorKind::Forbidden),
    ("permission denied", ErrorKind::Forbidden),
    ("access denied", ErrorKind::Forbidden),
    ("bad request", ErrorKind::BadRequest),
    ("invalid request", ErrorKind::BadRequest),
    ("invalid_request", ErrorKind::BadRequest),
    ("timed out", ErrorKind::Timeout),
    ("timeout", ErrorKind::Timeout),
    ("deadline exceeded", ErrorKind::Timeout),
    ("internal server error", ErrorKind::Internal),
    ("internal error", ErrorKind::Internal),
    ("service unavailable", ErrorKind::Internal),
    ("bad gateway", ErrorKind::Internal),
    ("overloaded", ErrorKind::Internal),
    ("command not found", ErrorKind::NotFound),
    ("not found", ErrorKind::NotFound),
    ("connection reset", ErrorKind::Transient),
    ("connection refused", ErrorKind::Transient),
    ("network", ErrorKind::Transient),
    ("temporarily unavailable", ErrorKind::Transient),
];

// ============================================================================
// Error Pattern
// ============================================================================

/// One row of a classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPattern {
    /// Substring to look for (case-insensitive).
    pub pattern: String,
    /// Kind assigned on match.
    pub kind: ErrorKind,
}

impl ErrorPattern {
    /// Creates a pattern. The needle is stored lowercased.
    pub fn new(pattern: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            pattern: pattern.into().to_lowercase(),
            kind,
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Ordered substring classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassifier {
    patterns: Vec<ErrorPattern>,
}

impl ErrorClassifier {
    /// Classifier using only the generic default table.
    pub fn with_defaults() -> Self {
        Self::new(Vec::new())
    }

    /// Classifier with provider-specific patterns checked before the defaults.
    pub fn new(provider_patterns: Vec<ErrorPattern>) -> Self {
        let mut patterns: Vec<ErrorPattern> = provider_patterns
            .into_iter()
            .map(|p| ErrorPattern::new(p.pattern, p.kind))
            .collect();
        patterns.extend(
            DEFAULT_PATTERNS
                .iter()
                .map(|(needle, kind)| ErrorPattern::new(*needle, *kind)),
        );
        Self { patterns }
    }

    /// Classifier with exactly the given patterns and no defaults.
    pub fn only(patterns: Vec<ErrorPattern>) -> Self {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| ErrorPattern::new(p.pattern, p.kind))
                .collect(),
        }
    }

    /// Returns the table in match order.
    pub fn patterns(&self) -> &[ErrorPattern] {
        &self.patterns
    }

    /// Classifies a failure.
    pub fn classify(&self, ctx: &FailureContext) -> ErrorKind {
        if let Some(kind) = ctx.http_status.and_then(classify_http_status) {
            return kind;
        }

        let haystack = format!("{}\n{}", ctx.stderr, ctx.stdout).to_lowercase();
        if let Some(hit) = self
            .patterns
            .iter()
            .find(|p| !p.pattern.is_empty() && haystack.contains(&p.pattern))
        {
            return hit.kind;
        }

        if ctx.exit_code == Some(EXIT_COMMAND_NOT_FOUND) {
            return ErrorKind::NotFound;
        }

        if self.patterns.is_empty() {
            ErrorKind::Unknown
        } else {
            ErrorKind::Transient
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Maps the HTTP statuses with a fixed meaning.
pub fn classify_http_status(status: u16) -> Option<ErrorKind> {
    match status {
        401 => Some(ErrorKind::Unauthorized),
        403 => Some(ErrorKind::Forbidden),
        404 => Some(ErrorKind::NotFound),
        429 => Some(ErrorKind::RateLimit),
        s if s >= 500 => Some(ErrorKind::Internal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stderr(msg: &str) -> FailureContext {
        FailureContext::from_exit("", msg, 1)
    }

    #[test]
    fn test_http_status_takes_priority() {
        let classifier = ErrorClassifier::with_defaults();
        let ctx = stderr("bad request").with_http_status(429);
        assert_eq!(classifier.classify(&ctx), ErrorKind::RateLimit);

        let ctx = stderr("whatever").with_http_status(503);
        assert_eq!(classifier.classify(&ctx), ErrorKind::Internal);
    }

    #[test]
    fn test_unmapped_status_falls_through_to_patterns() {
        let classifier = ErrorClassifier::with_defaults();
        let ctx = stderr("Bad Request: missing field").with_http_status(400);
        assert_eq!(classifier.classify(&ctx), ErrorKind::BadRequest);
    }

    #[test]
    fn test_case_insensitive_match() {
        let classifier = ErrorClassifier::with_defaults();
        assert_eq!(
            classifier.classify(&stderr("ERROR: Rate Limit Exceeded")),
            ErrorKind::RateLimit
        );
    }

    #[test]
    fn test_stdout_is_searched() {
        let classifier = ErrorClassifier::with_defaults();
        let ctx = FailureContext::from_exit("{\"error\":\"content_filter\"}", "", 1);
        assert_eq!(classifier.classify(&ctx), ErrorKind::ContentFilter);
    }

    #[test]
    fn test_context_length_beats_invalid_request() {
        let classifier = ErrorClassifier::with_defaults();
        let ctx = stderr("invalid request: prompt is too long");
        assert_eq!(classifier.classify(&ctx), ErrorKind::ContextLength);
    }

    #[test]
    fn test_provider_patterns_checked_first() {
        let classifier = ErrorClassifier::new(vec![ErrorPattern::new(
            "Invalid Request",
            ErrorKind::Transient,
        )]);
        assert_eq!(
            classifier.classify(&stderr("invalid request, retry later")),
            ErrorKind::Transient
        );
    }

    #[test]
    fn test_exit_127_without_pattern() {
        let classifier = ErrorClassifier::with_defaults();
        let ctx = FailureContext::from_exit("", "", EXIT_COMMAND_NOT_FOUND);
        assert_eq!(classifier.classify(&ctx), ErrorKind::NotFound);
    }

    #[test]
    fn test_default_is_transient() {
        let classifier = ErrorClassifier::with_defaults();
        assert_eq!(classifier.classify(&stderr("segfault")), ErrorKind::Transient);
    }

    #[test]
    fn test_empty_table_is_unknown() {
        let classifier = ErrorClassifier::only(Vec::new());
        assert_eq!(classifier.classify(&stderr("rate limit")), ErrorKind::Unknown);
        // Status and exit code still apply without a table.
        let ctx = FailureContext::from_exit("", "", EXIT_COMMAND_NOT_FOUND);
        assert_eq!(classifier.classify(&ctx), ErrorKind::NotFound);
    }
}
