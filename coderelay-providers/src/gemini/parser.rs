//! Gemini output parsers.

use coderelay_core::Usage;
use coderelay_exec::ProcessOutput;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// JSON Output Structures
// ============================================================================

/// The part of `gemini --output-format json` we read.
#[derive(Debug, Deserialize)]
struct GeminiOutput {
    #[serde(default)]
    stats: Option<GeminiStats>,
}

#[derive(Debug, Deserialize)]
struct GeminiStats {
    #[serde(default)]
    models: HashMap<String, GeminiModelStats>,
}

#[derive(Debug, Deserialize)]
struct GeminiModelStats {
    #[serde(default)]
    tokens: GeminiTokens,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiTokens {
    #[serde(default)]
    prompt: u64,
    #[serde(default)]
    candidates: u64,
    #[serde(default)]
    cached: u64,
}

// ============================================================================
// Parsers
// ============================================================================

/// Sums token usage across every model Gemini reports.
pub fn parse_gemini_usage(output: &ProcessOutput) -> Option<Usage> {
    let parsed: GeminiOutput = serde_json::from_str(output.stdout.trim()).ok()?;
    let stats = parsed.stats?;

    let usage = stats.models.values().fold(Usage::default(), |mut acc, model| {
        acc.input_tokens += model.tokens.prompt;
        acc.output_tokens += model.tokens.candidates;
        acc.cached_tokens += model.tokens.cached;
        acc
    });

    debug!(models = stats.models.len(), total = usage.total(), "Parsed Gemini usage");
    (usage.total() > 0).then_some(usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn output(stdout: &str) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_sums_models() {
        let json = r#"{
            "response": "ok",
            "stats": {"models": {
                "gemini-2.5-pro": {"tokens": {"prompt": 100, "candidates": 20, "cached": 5}},
                "gemini-2.5-flash": {"tokens": {"prompt": 10, "candidates": 2}}
            }}
        }"#;
        let usage = parse_gemini_usage(&output(json)).unwrap();
        assert_eq!(usage.input_tokens, 110);
        assert_eq!(usage.output_tokens, 22);
        assert_eq!(usage.cached_tokens, 5);
    }

    #[test]
    fn test_missing_stats() {
        assert!(parse_gemini_usage(&output(r#"{"response": "ok"}"#)).is_none());
        assert!(parse_gemini_usage(&output("plain text")).is_none());
    }
}
