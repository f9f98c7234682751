//! Codex output parsers.

use coderelay_core::Usage;
use coderelay_exec::ProcessOutput;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Matches "input tokens: 1,234".
static INPUT_TOKENS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)input tokens\s*:?\s*([\d,]+)").expect("Invalid regex")
});

/// Matches "output tokens: 567".
static OUTPUT_TOKENS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)output tokens\s*:?\s*([\d,]+)").expect("Invalid regex")
});

/// Matches "tokens used: 1,801", possibly with the count on the next line.
static TOKENS_USED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tokens used\s*:?\s*([\d,]+)").expect("Invalid regex")
});

fn last_count(re: &Regex, text: &str) -> Option<u64> {
    re.captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

/// Extracts token usage from Codex's free-text summary.
///
/// Prefers the split input/output counts; falls back to the single
/// "tokens used" total, attributed to output.
pub fn parse_codex_usage(output: &ProcessOutput) -> Option<Usage> {
    let text = format!("{}\n{}", output.stderr, output.stdout);

    let input = last_count(&INPUT_TOKENS_RE, &text);
    let output_tokens = last_count(&OUTPUT_TOKENS_RE, &text);
    if input.is_some() || output_tokens.is_some() {
        return Some(Usage {
            input_tokens: input.unwrap_or(0),
            output_tokens: output_tokens.unwrap_or(0),
            cached_tokens: 0,
        });
    }

    let total = last_count(&TOKENS_USED_RE, &text)?;
    debug!(total, "Parsed Codex token total");
    Some(Usage {
        input_tokens: 0,
        output_tokens: total,
        cached_tokens: 0,
    })
}

// ============================================================================
// Tests
// ============================================================================
