//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

use super::{ProviderRow, ProviderSource, StatusRow};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use coderelay_core::{ErrorKind, Usage};
use coderelay_router::{Attempt, RouteError, RouteResponse};
use coderelay_store::{ErrorRecord, ProviderState};
use std::time::Duration;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

fn response_after_failover() -> RouteResponse {
    RouteResponse {
        provider: "codex".to_string(),
        text: "done".to_string(),
        usage: Some(Usage {
            input_tokens: 1200,
            output_tokens: 300,
            ..Usage::default()
        }),
        attempts: vec![
            Attempt::failure("claude", ErrorKind::RateLimit, "429", Duration::from_millis(200)),
            Attempt::success("codex", Duration::from_millis(1800)),
        ],
        duration: Duration::from_millis(2000),
    }
}

fn exhausted() -> RouteError {
    RouteError::Exhausted {
        attempts: vec![
            Attempt::skipped("claude", ErrorKind::OutOfCredits, "cooling down"),
            Attempt::failure("codex", ErrorKind::Transient, "connection reset", Duration::ZERO),
        ],
    }
}

fn status_row() -> StatusRow {
    let mut state = ProviderState::new(today());
    state.requests_today = 4;
    state.tokens_saved_today = 2500;
    state.total_tokens_saved = 1_200_000;
    StatusRow {
        id: "claude".to_string(),
        state,
        daily_limit: Some(50),
    }
}

fn provider_row(installed: bool) -> ProviderRow {
    ProviderRow {
        id: "aider".to_string(),
        display_name: "Aider".to_string(),
        binary: "aider".to_string(),
        source: ProviderSource::Configured,
        installed,
        streaming: false,
    }
}

mod text_formatter_tests {
    use super::super::text::TextFormatter;
    use super::*;

    #[test]
    fn test_route_footer() {
        let formatter = TextFormatter::new(false);
        let footer = formatter.format_route_footer(&response_after_failover());

        assert!(footer.contains("via codex"));
        assert!(footer.contains("2.0s"));
        assert!(footer.contains("1.5K tokens"));
        assert!(footer.contains("1 failover"));
        assert!(!footer.contains("failovers"));
    }

    #[test]
    fn test_route_footer_no_usage() {
        let formatter = TextFormatter::new(false);
        let mut response = response_after_failover();
        response.usage = None;
        response.attempts.remove(0);

        let footer = formatter.format_route_footer(&response);
        assert!(!footer.contains("tokens"));
        assert!(!footer.contains("failover"));
    }

    #[test]
    fn test_exhausted_lists_every_attempt() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_route_error(&exhausted());

        assert!(output.starts_with("Error: all providers failed"));
        assert!(output.contains("claude"));
        assert!(output.contains("OUT_OF_CREDITS cooling down"));
        assert!(output.contains("TRANSIENT connection reset"));
        assert_eq!(output.lines().count(), 3);
    }

    #[test]
    fn test_rejected_names_provider() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_route_error(&RouteError::Rejected {
            provider: "gemini".into(),
            kind: ErrorKind::Unauthorized,
            message: "invalid API key".into(),
        });

        assert_eq!(
            output,
            "Error: gemini rejected the request (UNAUTHORIZED): invalid API key"
        );
    }

    #[test]
    fn test_failover_notice() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_failover("claude", ErrorKind::RateLimit, "slow down");
        assert!(output.contains("claude failed (RATE_LIMIT): slow down"));
    }

    #[test]
    fn test_candidates_numbered() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_candidates(&["claude".into(), "codex".into()]);
        assert_eq!(output, " 1. claude\n 2. codex");
    }

    #[test]
    fn test_status_ready() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_status(&status_row(), now());

        assert!(output.starts_with("claude (ready)"));
        assert!(output.contains("Requests today: 4/50"));
        assert!(output.contains("2.5K today, 1.2M total"));
        assert!(!output.contains("Last error"));
    }

    #[test]
    fn test_status_cooling_down() {
        let formatter = TextFormatter::new(false);
        let mut row = status_row();
        row.daily_limit = None;
        row.state.out_of_credits_until = Some(now() + chrono::Duration::minutes(45));
        row.state.push_error(ErrorRecord {
            at: now(),
            message: "RATE_LIMIT: 429".to_string(),
        });

        let output = formatter.format_status(&row, now());
        assert!(output.contains("cooling down, back in 45 minutes"));
        assert!(output.contains("Requests today: 4\n"));
        assert!(output.contains("Last error:     RATE_LIMIT: 429"));
    }

    #[test]
    fn test_provider_line() {
        let formatter = TextFormatter::new(false);

        let installed = formatter.format_provider_line(&provider_row(true));
        assert!(installed.contains("Aider ✓"));
        assert!(installed.contains("config"));

        let missing = formatter.format_provider_line(&provider_row(false));
        assert!(missing.contains("Aider −"));
    }

    #[test]
    fn test_no_colors_when_disabled() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_route_error(&exhausted());
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_colors_when_enabled() {
        let formatter = TextFormatter::new(true);
        let output = formatter.format_route_error(&exhausted());
        assert!(output.contains("\x1b[31m"));
    }
}

mod json_formatter_tests {
    use super::super::json::JsonFormatter;
    use super::*;
    use coderelay_router::RouteEvent;
    use serde_json::Value;

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn test_response_shape() {
        let formatter = JsonFormatter::new(false);
        let value = parse(&formatter.format_response(&response_after_failover()).unwrap());

        assert_eq!(value["provider"], "codex");
        assert_eq!(value["text"], "done");
        assert_eq!(value["durationMs"], 2000);
        assert_eq!(value["attempts"][0]["kind"], "RATE_LIMIT");
        assert_eq!(value["attempts"][0]["success"], false);
        assert_eq!(value["attempts"][1]["success"], true);
        assert!(value["attempts"][1].get("kind").is_none());
    }

    #[test]
    fn test_exhausted_shape() {
        let formatter = JsonFormatter::new(false);
        let value = parse(&formatter.format_route_error(&exhausted()).unwrap());

        assert_eq!(value["kind"], "TRANSIENT");
        assert_eq!(value["attempts"][0]["skipped"], true);
        assert!(value["error"].as_str().unwrap().starts_with("All providers failed"));
        assert!(value.get("provider").is_none());
    }

    #[test]
    fn test_rejected_shape() {
        let formatter = JsonFormatter::new(false);
        let value = parse(
            &formatter
                .format_route_error(&RouteError::Rejected {
                    provider: "claude".into(),
                    kind: ErrorKind::ContextLength,
                    message: "prompt is too long".into(),
                })
                .unwrap(),
        );

        assert_eq!(value["provider"], "claude");
        assert_eq!(value["kind"], "CONTEXT_LENGTH");
        assert!(value.get("attempts").is_none());
    }

    #[test]
    fn test_event_tags() {
        let formatter = JsonFormatter::new(false);

        let failover = parse(
            &formatter
                .format_event(&RouteEvent::Failover {
                    provider: "claude".into(),
                    kind: ErrorKind::OutOfCredits,
                    message: "quota exceeded".into(),
                })
                .unwrap(),
        );
        assert_eq!(failover["event"], "failover");
        assert_eq!(failover["kind"], "OUT_OF_CREDITS");

        let complete = parse(
            &formatter
                .format_event(&RouteEvent::Complete(response_after_failover()))
                .unwrap(),
        );
        assert_eq!(complete["event"], "complete");
        assert_eq!(complete["provider"], "codex");

        let failed = parse(&formatter.format_event(&RouteEvent::Failed(RouteError::Aborted)).unwrap());
        assert_eq!(failed["event"], "failed");
    }

    #[test]
    fn test_status_single_is_object() {
        let formatter = JsonFormatter::new(false);
        let value = parse(&formatter.format_status(&[status_row()], now()).unwrap());

        assert!(value.is_object());
        assert_eq!(value["provider"], "claude");
        assert_eq!(value["requestsToday"], 4);
        assert_eq!(value["dailyLimit"], 50);
        assert_eq!(value["coolingDown"], false);
        assert!(value["outOfCreditsUntil"].is_null());
        assert_eq!(value["totalTokensSaved"], 1_200_000);
    }

    #[test]
    fn test_status_many_is_array() {
        let formatter = JsonFormatter::new(false);
        let mut cooling = status_row();
        cooling.id = "codex".into();
        cooling.state.out_of_credits_until = Some(now() + chrono::Duration::hours(1));

        let value = parse(&formatter.format_status(&[status_row(), cooling], now()).unwrap());
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["coolingDown"], true);
        assert_eq!(rows[1]["outOfCreditsUntil"], "2026-03-10T13:00:00+00:00");
    }

    #[test]
    fn test_providers_shape() {
        let formatter = JsonFormatter::new(false);
        let value = parse(&formatter.format_providers(&[provider_row(false)]).unwrap());

        assert_eq!(value[0]["id"], "aider");
        assert_eq!(value[0]["displayName"], "Aider");
        assert_eq!(value[0]["source"], "config");
        assert_eq!(value[0]["installed"], false);
    }
}
