//! Tests for the generic CLI provider.
//!
//! Most cases drive `sh -c '<script>' <prompt>`, where the prompt lands in
//! `$0`, so no provider tool has to be installed.

use coderelay_core::{
    CodingRequest, ErrorKind, ErrorPattern, InvokeOptions, LaunchConfig, OutputFormat,
    PromptStyle, Provider, ProviderError, ProviderEvent,
};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli_provider::{CliProvider, usage_from_value};

fn sh(script: &str) -> LaunchConfig {
    LaunchConfig::new("sh").with_args(["-c", script])
}

fn json_output(text_pointer: &str, usage_pointer: Option<&str>) -> OutputFormat {
    OutputFormat::Json {
        text_pointer: text_pointer.to_string(),
        usage_pointer: usage_pointer.map(ToString::to_string),
    }
}

// ============================================================================
// Command Construction
// ============================================================================

#[test]
fn test_build_command_arg_style() {
    let mut launch = LaunchConfig::new("tool").with_args(["run"]);
    launch.model_flag = Some("--model".into());
    launch.file_flag = Some("--file".into());
    let provider = CliProvider::new("tool", launch);

    let request = CodingRequest::new("fix it")
        .with_model("large")
        .with_file("src/main.rs");
    let spec = provider.build_command(&request, &InvokeOptions::default());

    assert_eq!(spec.program, "tool");
    assert_eq!(
        spec.args,
        vec!["run", "--model", "large", "--file", "src/main.rs", "fix it"]
    );
    assert!(spec.stdin.is_none());
}

#[test]
fn test_build_command_flag_and_stdin_styles() {
    let flag = CliProvider::new(
        "a",
        LaunchConfig::new("a").with_prompt(PromptStyle::Flag { flag: "-p".into() }),
    );
    let spec = flag.build_command(&CodingRequest::new("hi"), &InvokeOptions::default());
    assert_eq!(spec.args, vec!["-p", "hi"]);

    let stdin = CliProvider::new("b", LaunchConfig::new("b").with_prompt(PromptStyle::Stdin));
    let spec = stdin.build_command(&CodingRequest::new("hi"), &InvokeOptions::default());
    assert!(spec.args.is_empty());
    assert_eq!(spec.stdin.as_deref(), Some("hi"));
}

#[test]
fn test_files_appended_to_prompt_without_flag() {
    let provider = CliProvider::new("tool", LaunchConfig::new("tool"));
    let request = CodingRequest::new("review").with_file(PathBuf::from("a.rs"));
    let spec = provider.build_command(&request, &InvokeOptions::default());
    assert_eq!(spec.args, vec!["review\n\nFiles:\n- a.rs"]);
}

#[test]
fn test_model_ignored_without_flag() {
    let provider = CliProvider::new("tool", LaunchConfig::new("tool"));
    let spec = provider.build_command(
        &CodingRequest::new("x").with_model("m"),
        &InvokeOptions::default(),
    );
    assert_eq!(spec.args, vec!["x"]);
}

#[test]
fn test_working_dir_forwarded() {
    let provider = CliProvider::new("tool", LaunchConfig::new("tool"));
    let options = InvokeOptions::default().working_dir("/tmp");
    let spec = provider.build_command(&CodingRequest::new("x"), &options);
    assert_eq!(spec.working_dir, Some(PathBuf::from("/tmp")));
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_launch_patterns_before_defaults() {
    let mut launch = LaunchConfig::new("tool");
    launch.error_patterns = vec![ErrorPattern::new("bad request, try later", ErrorKind::Transient)];
    let provider = CliProvider::new("tool", launch);

    let ctx = coderelay_core::FailureContext::from_exit("", "Bad Request, try later", 1);
    assert_eq!(provider.classify_error(&ctx), ErrorKind::Transient);

    let ctx = coderelay_core::FailureContext::from_exit("", "bad request", 1);
    assert_eq!(provider.classify_error(&ctx), ErrorKind::BadRequest);
}

#[test]
fn test_defaults_can_be_disabled() {
    let mut launch = LaunchConfig::new("tool");
    launch.default_patterns = false;
    let provider = CliProvider::new("tool", launch);

    let ctx = coderelay_core::FailureContext::from_exit("", "rate limit", 1);
    assert_eq!(provider.classify_error(&ctx), ErrorKind::Unknown);
}

#[test]
fn test_usage_from_value_spellings() {
    let usage = usage_from_value(&serde_json::json!({
        "input_tokens": 10, "output_tokens": 5, "cache_read_input_tokens": 2
    }))
    .unwrap();
    assert_eq!((usage.input_tokens, usage.output_tokens, usage.cached_tokens), (10, 5, 2));

    let usage = usage_from_value(&serde_json::json!({"prompt_tokens": 1, "completion_tokens": 2})).unwrap();
    assert_eq!(usage.total(), 3);

    assert!(usage_from_value(&serde_json::json!({})).is_none());
}

// ============================================================================
// Execution
// ============================================================================

#[cfg(unix)]
mod exec {
    use super::*;

    #[tokio::test]
    async fn test_text_output() {
        let provider = CliProvider::new("echo", sh("printf 'echo: %s\\n' \"$0\""));
        let response = provider
            .run_once(&CodingRequest::new("hi"), &InvokeOptions::default())
            .await
            .unwrap();

        assert_eq!(response.provider, "echo");
        assert_eq!(response.text, "echo: hi");
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn test_stdin_prompt() {
        let provider = CliProvider::new(
            "cat",
            LaunchConfig::new("cat").with_prompt(PromptStyle::Stdin),
        );
        let response = provider
            .run_once(&CodingRequest::new("piped prompt"), &InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(response.text, "piped prompt");
    }

    #[tokio::test]
    async fn test_json_output_with_usage() {
        let launch = sh(
            r#"printf '{"result":"%s","usage":{"input_tokens":3,"output_tokens":4}}' "$0""#,
        )
        .with_output(json_output("/result", Some("/usage")));
        let provider = CliProvider::new("json", launch);

        let response = provider
            .run_once(&CodingRequest::new("done"), &InvokeOptions::default())
            .await
            .unwrap();

        assert_eq!(response.text, "done");
        assert_eq!(response.tokens_saved(), 7);
    }

    #[tokio::test]
    async fn test_json_lines_last_match_wins() {
        let launch = sh(
            r#"printf '{"type":"start"}\n{"type":"result","result":"first"}\n{"type":"result","result":"final"}\n'"#,
        )
        .with_output(json_output("/result", None));
        let provider = CliProvider::new("jsonl", launch);

        let response = provider
            .run_once(&CodingRequest::new("x"), &InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(response.text, "final");
    }

    #[tokio::test]
    async fn test_json_missing_pointer_is_invalid_output() {
        let launch = sh("echo '{\"other\": 1}'").with_output(json_output("/result", None));
        let provider = CliProvider::new("json", launch);

        let result = provider
            .run_once(&CodingRequest::new("x"), &InvokeOptions::default())
            .await;
        assert!(matches!(result, Err(ProviderError::InvalidOutput(_))));
    }

    #[tokio::test]
    async fn test_failure_is_classifiable() {
        let provider = CliProvider::new(
            "failing",
            sh("echo 'Error: rate limit exceeded' >&2; exit 1"),
        );
        let error = provider
            .run_once(&CodingRequest::new("x"), &InvokeOptions::default())
            .await
            .unwrap_err();

        let ProviderError::Failed(ctx) = &error else {
            panic!("expected Failed, got {error:?}");
        };
        assert_eq!(ctx.exit_code, Some(1));
        assert_eq!(provider.classify_error(ctx), ErrorKind::RateLimit);
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let provider = CliProvider::new("ghost", LaunchConfig::new("definitely_not_a_real_command_12345"));
        let error = provider
            .run_once(&CodingRequest::new("x"), &InvokeOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(error, ProviderError::NotFound(_)));
        assert_eq!(provider.classify_error(&error.failure_context()), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_output_limit() {
        let provider = CliProvider::new("loud", sh("head -c 100000 /dev/zero"));
        let options = InvokeOptions::default().max_output_bytes(1024);

        let result = provider.run_once(&CodingRequest::new("x"), &options).await;
        assert!(matches!(result, Err(ProviderError::OutputLimit { limit: 1024 })));
    }

    #[tokio::test]
    async fn test_launch_timeout_applies() {
        let mut launch = sh("sleep 5");
        launch.timeout_secs = Some(0);
        let provider = CliProvider::new("slow", launch);

        let result = provider
            .run_once(&CodingRequest::new("x"), &InvokeOptions::default())
            .await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_streaming_text_deltas() {
        let mut launch = sh("printf 'one\\ntwo\\nthree\\n'");
        launch.streaming = true;
        let provider = Arc::new(CliProvider::new("stream", launch));
        assert!(provider.supports_streaming());

        let events: Vec<_> = provider
            .run_stream(CodingRequest::new("x"), InvokeOptions::default())
            .collect()
            .await;

        assert!(matches!(&events[0], ProviderEvent::Start { provider } if provider == "stream"));
        let deltas: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                ProviderEvent::TextDelta(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["one\n", "two\n", "three\n"]);
        assert!(
            matches!(events.last(), Some(ProviderEvent::Complete(r)) if r.text == "one\ntwo\nthree")
        );
    }

    #[tokio::test]
    async fn test_non_streaming_emits_single_delta() {
        let provider = Arc::new(CliProvider::new("plain", sh("printf 'a\\nb\\n'")));
        let events: Vec<_> = provider
            .run_stream(CodingRequest::new("x"), InvokeOptions::default())
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[1], ProviderEvent::TextDelta(t) if t == "a\nb"));
        assert!(events[2].is_terminal());
    }

    #[tokio::test]
    async fn test_stream_error_is_terminal() {
        let provider = Arc::new(CliProvider::new("bad", sh("echo 'bad request' >&2; exit 2")));
        let events: Vec<_> = provider
            .run_stream(CodingRequest::new("x"), InvokeOptions::default())
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events.last(), Some(ProviderEvent::Error(ProviderError::Failed(_)))));
    }

    #[tokio::test]
    async fn test_cancelled_stream_reports_aborted() {
        let provider = Arc::new(CliProvider::new("slow", sh("sleep 5")));
        let options = InvokeOptions::default();
        options.cancel.cancel();

        let events: Vec<_> = provider
            .run_stream(CodingRequest::new("x"), options)
            .collect()
            .await;
        assert!(matches!(events.last(), Some(ProviderEvent::Error(e)) if e.is_aborted()));
    }
}
