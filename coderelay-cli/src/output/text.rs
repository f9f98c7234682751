//! Text output formatting with colors.

use chrono::{DateTime, Duration, Local, Utc};
use coderelay_core::ErrorKind;
use coderelay_router::{Attempt, RouteError, RouteResponse};
use std::time::Duration as StdDuration;

use super::{ProviderRow, StatusRow};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Route
    // ========================================================================

    /// Formats the one-line summary printed after a response.
    pub fn format_route_footer(&self, response: &RouteResponse) -> String {
        let mut parts = vec![
            format!("via {}", self.cyan(&response.provider)),
            self.format_duration(response.duration),
        ];
        if let Some(usage) = response.usage {
            parts.push(format!("{} tokens", self.format_number(usage.total())));
        }
        let failovers = response.failovers().count();
        if failovers > 0 {
            parts.push(format!(
                "{failovers} failover{}",
                if failovers == 1 { "" } else { "s" }
            ));
        }
        self.dim(&parts.join(" · "))
    }

    /// Formats a mid-stream failover notice.
    pub fn format_failover(&self, provider: &str, kind: ErrorKind, message: &str) -> String {
        format!(
            "{} {} failed ({}): {}; trying next provider",
            self.yellow("↪"),
            self.bold(provider),
            self.kind_colored(kind),
            message
        )
    }

    /// Formats one attempt line.
    pub fn format_attempt(&self, attempt: &Attempt) -> String {
        let mark = if attempt.success {
            self.green("✓")
        } else if attempt.skipped {
            self.dim("−")
        } else {
            self.red("✗")
        };

        let detail = match (attempt.kind, &attempt.error) {
            (Some(kind), Some(error)) => format!("{} {}", self.kind_colored(kind), error),
            (Some(kind), None) => self.kind_colored(kind),
            _ => self.format_duration(attempt.duration),
        };

        format!("  {mark} {:<12} {detail}", attempt.provider)
    }

    /// Formats a routing failure, with the per-candidate breakdown.
    pub fn format_route_error(&self, error: &RouteError) -> String {
        match error {
            RouteError::Exhausted { attempts } => {
                let mut lines = vec![format!("{}: all providers failed", self.red("Error"))];
                lines.extend(attempts.iter().map(|a| self.format_attempt(a)));
                lines.join("\n")
            }
            RouteError::Rejected {
                provider,
                kind,
                message,
            } => format!(
                "{}: {} rejected the request ({}): {}",
                self.red("Error"),
                self.bold(provider),
                self.kind_colored(*kind),
                message
            ),
            other => format!("{}: {other}", self.red("Error")),
        }
    }

    /// Formats a dry-run candidate list.
    pub fn format_candidates(&self, candidates: &[String]) -> String {
        candidates
            .iter()
            .enumerate()
            .map(|(i, id)| format!("{:>2}. {id}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Formats one provider's state.
    pub fn format_status(&self, row: &StatusRow, now: DateTime<Utc>) -> String {
        let state = &row.state;
        let mut lines = Vec::new();

        let availability = if state.is_out_of_credits(now) {
            let until = state.out_of_credits_until.unwrap_or(now);
            self.yellow(&format!("cooling down, back {}", self.format_until(until, now)))
        } else if state.consecutive_errors > 0 {
            self.yellow(&format!("{} consecutive errors", state.consecutive_errors))
        } else {
            self.green("ready")
        };
        lines.push(format!("{} ({})", self.bold(&row.id), availability));

        let requests = match row.daily_limit {
            Some(limit) => format!("{}/{limit}", state.requests_today),
            None => state.requests_today.to_string(),
        };
        lines.push(format!("  Requests today: {requests}"));
        lines.push(format!(
            "  Tokens saved:   {} today, {} total",
            self.format_number(state.tokens_saved_today),
            self.format_number(state.total_tokens_saved)
        ));

        if let Some(last_used) = state.last_used_at {
            lines.push(format!(
                "  Last used:      {}",
                last_used.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ));
        }

        if let Some(last) = state.last_errors.last() {
            lines.push(format!("  Last error:     {}", self.red(&last.message)));
        }

        lines.join("\n")
    }

    /// Formats a cooldown end as a countdown or a local time.
    pub fn format_until(&self, until: DateTime<Utc>, now: DateTime<Utc>) -> String {
        if until <= now {
            return "now".to_string();
        }

        let diff = until - now;
        if diff < Duration::hours(1) {
            let mins = diff.num_minutes().max(1);
            format!("in {} minute{}", mins, if mins == 1 { "" } else { "s" })
        } else if diff < Duration::hours(24) {
            let hours = diff.num_hours();
            let mins = diff.num_minutes() % 60;
            if mins > 0 {
                format!("in {hours}h {mins}m")
            } else {
                format!("in {} hour{}", hours, if hours == 1 { "" } else { "s" })
            }
        } else {
            let local = until.with_timezone(&Local);
            local.format("%a at %l:%M %p").to_string().trim().to_string()
        }
    }

    // ========================================================================
    // Providers
    // ========================================================================

    /// Formats provider list header.
    pub fn format_providers_header(&self) -> String {
        format!(
            "{:<20} {:<12} {:<20} {:<8} {}",
            self.bold("Provider"),
            self.bold("ID"),
            self.bold("Binary"),
            self.bold("Source"),
            self.bold("Stream")
        )
    }

    /// Formats a single provider line.
    pub fn format_provider_line(&self, row: &ProviderRow) -> String {
        let status = if row.installed {
            self.green("✓")
        } else {
            self.dim("−")
        };
        let streaming = if row.streaming {
            self.green("✓")
        } else {
            self.dim("−")
        };

        format!(
            "{:<20} {:<12} {:<20} {:<8} {}",
            format!("{} {}", row.display_name, status),
            row.id,
            row.binary,
            row.source.as_str(),
            streaming
        )
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn kind_colored(&self, kind: ErrorKind) -> String {
        if kind.is_request_fatal() {
            self.red(kind.as_str())
        } else if kind.triggers_cooldown() {
            self.yellow(kind.as_str())
        } else {
            self.dim(kind.as_str())
        }
    }

    fn format_number(&self, n: u64) -> String {
        #[allow(clippy::cast_precision_loss)]
        let f = n as f64;
        if n >= 1_000_000 {
            format!("{:.1}M", f / 1_000_000.0)
        } else if n >= 1_000 {
            format!("{:.1}K", f / 1_000.0)
        } else {
            n.to_string()
        }
    }

    fn format_duration(&self, duration: StdDuration) -> String {
        if duration.as_secs() >= 60 {
            format!("{}m {}s", duration.as_secs() / 60, duration.as_secs() % 60)
        } else {
            format!("{:.1}s", duration.as_secs_f64())
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

// ============================================================================
// Tests
// ============================================================================
