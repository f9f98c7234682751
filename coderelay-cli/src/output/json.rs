//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use coderelay_core::{ErrorKind, Usage};
use coderelay_router::{Attempt, RouteError, RouteEvent, RouteResponse};
use coderelay_store::ErrorRecord;
use serde::{Serialize, Serializer};
use std::time::Duration;

use super::{ProviderRow, StatusRow};

// ============================================================================
// Output Types
// ============================================================================

/// A successful route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOutput {
    pub provider: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub attempts: Vec<AttemptOutput>,
    pub duration_ms: u64,
}

/// One candidate of a route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutput {
    pub provider: String,
    pub success: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A failed route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptOutput>,
}

/// One line of a streamed route.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EventOutput {
    Attempt {
        provider: String,
    },
    Delta {
        provider: String,
        text: String,
    },
    Chunk {
        provider: String,
        value: serde_json::Value,
    },
    Failover {
        provider: String,
        kind: ErrorKind,
        message: String,
    },
    Complete(RouteOutput),
    Failed(ErrorOutput),
}

/// One provider's state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub provider: String,
    pub requests_today: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<u32>,
    pub cooling_down: bool,
    #[serde(serialize_with = "serialize_datetime_opt")]
    pub out_of_credits_until: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_datetime_opt")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub consecutive_errors: u32,
    pub last_errors: Vec<ErrorRecord>,
    pub tokens_saved_today: u64,
    pub total_tokens_saved: u64,
}

/// One known provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutput {
    pub id: String,
    pub display_name: String,
    pub binary: String,
    pub source: &'static str,
    pub installed: bool,
    pub streaming: bool,
}

// ============================================================================
// Serialization helpers
// ============================================================================

#[allow(clippy::ref_option)]
fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a successful route.
    pub fn format_response(&self, response: &RouteResponse) -> Result<String> {
        self.format(&response_output(response))
    }

    /// Formats a failed route.
    pub fn format_route_error(&self, error: &RouteError) -> Result<String> {
        self.format(&error_output(error))
    }

    /// Formats one streaming event as a single line.
    ///
    /// Always compact, so the stream stays one JSON document per line.
    pub fn format_event(&self, event: &RouteEvent) -> Result<String> {
        let output = match event {
            RouteEvent::Attempt { provider } => EventOutput::Attempt {
                provider: provider.clone(),
            },
            RouteEvent::Delta { provider, text } => EventOutput::Delta {
                provider: provider.clone(),
                text: text.clone(),
            },
            RouteEvent::Chunk { provider, value } => EventOutput::Chunk {
                provider: provider.clone(),
                value: value.clone(),
            },
            RouteEvent::Failover {
                provider,
                kind,
                message,
            } => EventOutput::Failover {
                provider: provider.clone(),
                kind: *kind,
                message: message.clone(),
            },
            RouteEvent::Complete(response) => EventOutput::Complete(response_output(response)),
            RouteEvent::Failed(error) => EventOutput::Failed(error_output(error)),
        };
        Ok(serde_json::to_string(&output)?)
    }

    /// Formats a dry-run candidate list.
    pub fn format_candidates(&self, candidates: &[String]) -> Result<String> {
        self.format(&serde_json::json!({ "candidates": candidates }))
    }

    /// Formats provider states.
    pub fn format_status(&self, rows: &[StatusRow], now: DateTime<Utc>) -> Result<String> {
        let outputs: Vec<StatusOutput> = rows
            .iter()
            .map(|row| StatusOutput {
                provider: row.id.clone(),
                requests_today: row.state.requests_today,
                daily_limit: row.daily_limit,
                cooling_down: row.state.is_out_of_credits(now),
                out_of_credits_until: row.state.out_of_credits_until,
                last_used_at: row.state.last_used_at,
                consecutive_errors: row.state.consecutive_errors,
                last_errors: row.state.last_errors.clone(),
                tokens_saved_today: row.state.tokens_saved_today,
                total_tokens_saved: row.state.total_tokens_saved,
            })
            .collect();

        if outputs.len() == 1 {
            self.format(&outputs[0])
        } else {
            self.format(&outputs)
        }
    }

    /// Formats the provider list.
    pub fn format_providers(&self, rows: &[ProviderRow]) -> Result<String> {
        let outputs: Vec<ProviderOutput> = rows
            .iter()
            .map(|row| ProviderOutput {
                id: row.id.clone(),
                display_name: row.display_name.clone(),
                binary: row.binary.clone(),
                source: row.source.as_str(),
                installed: row.installed,
                streaming: row.streaming,
            })
            .collect();
        self.format(&outputs)
    }
}

fn attempt_output(attempt: &Attempt) -> AttemptOutput {
    AttemptOutput {
        provider: attempt.provider.clone(),
        success: attempt.success,
        skipped: attempt.skipped,
        kind: attempt.kind,
        error: attempt.error.clone(),
        duration_ms: millis(attempt.duration),
    }
}

fn response_output(response: &RouteResponse) -> RouteOutput {
    RouteOutput {
        provider: response.provider.clone(),
        text: response.text.clone(),
        usage: response.usage,
        attempts: response.attempts.iter().map(attempt_output).collect(),
        duration_ms: millis(response.duration),
    }
}

fn error_output(error: &RouteError) -> ErrorOutput {
    let provider = match error {
        RouteError::Rejected { provider, .. } => Some(provider.clone()),
        _ => None,
    };
    ErrorOutput {
        error: error.to_string(),
        kind: error.kind(),
        provider,
        attempts: error.attempts().iter().map(attempt_output).collect(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pretty() {
        let formatter = JsonFormatter::new(true);
        let output = formatter.format(&serde_json::json!({"test": 123})).unwrap();
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_format_compact() {
        let formatter = JsonFormatter::new(false);
        let output = formatter.format(&serde_json::json!({"test": 123})).unwrap();
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_events_stay_compact_when_pretty() {
        let formatter = JsonFormatter::new(true);
        let line = formatter
            .format_event(&RouteEvent::Delta {
                provider: "codex".into(),
                text: "fn main() {}\n".into(),
            })
            .unwrap();

        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "delta");
        assert_eq!(value["text"], "fn main() {}\n");
    }
}
