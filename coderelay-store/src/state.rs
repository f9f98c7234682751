//! Persisted per-provider usage state.
//!
//! The whole document is one JSON object with camelCase keys:
//!
//! ```json
//! { "version": 1, "providers": { "claude": { "requestsToday": 3, ... } } }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document version written by this build.
pub const CURRENT_VERSION: u32 = 1;

/// Number of error records kept per provider.
pub const MAX_LAST_ERRORS: usize = 10;

// ============================================================================
// Error Record
// ============================================================================

/// One recorded provider failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// When the failure was recorded.
    pub at: DateTime<Utc>,
    /// `"{KIND}: {message}"`.
    pub message: String,
}

// ============================================================================
// Provider State
// ============================================================================

/// Usage counters and cooldown for a single provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderState {
    /// Last successful request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    /// Successful requests since `last_reset`.
    #[serde(default)]
    pub requests_today: u32,
    /// Local calendar day the daily counters belong to.
    pub last_reset: NaiveDate,
    /// Skip this provider until then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_credits_until: Option<DateTime<Utc>>,
    /// Most recent failures, oldest first.
    #[serde(default)]
    pub last_errors: Vec<ErrorRecord>,
    /// Failures since the last success.
    #[serde(default)]
    pub consecutive_errors: u32,
    /// Tokens reported by successful requests today.
    #[serde(default)]
    pub tokens_saved_today: u64,
    /// Tokens reported since the state was created.
    #[serde(default)]
    pub total_tokens_saved: u64,
}

impl ProviderState {
    /// Zeroed state for `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            last_used_at: None,
            requests_today: 0,
            last_reset: today,
            out_of_credits_until: None,
            last_errors: Vec::new(),
            consecutive_errors: 0,
            tokens_saved_today: 0,
            total_tokens_saved: 0,
        }
    }

    /// Resets the daily counters if `today` is a later day.
    ///
    /// Returns true if anything changed.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if today <= self.last_reset {
            return false;
        }
        self.requests_today = 0;
        self.tokens_saved_today = 0;
        self.out_of_credits_until = None;
        self.last_reset = today;
        true
    }

    /// Returns true while the cooldown is in the future.
    ///
    /// A cooldown in the past counts as absent.
    pub fn is_out_of_credits(&self, now: DateTime<Utc>) -> bool {
        self.out_of_credits_until.is_some_and(|until| until > now)
    }

    /// Appends an error record, evicting the oldest past the cap.
    pub fn push_error(&mut self, record: ErrorRecord) {
        self.last_errors.push(record);
        if self.last_errors.len() > MAX_LAST_ERRORS {
            let excess = self.last_errors.len() - MAX_LAST_ERRORS;
            self.last_errors.drain(..excess);
        }
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
    }

    /// Applies a successful request.
    pub fn record_success(&mut self, at: DateTime<Utc>, tokens_saved: u64) {
        self.requests_today = self.requests_today.saturating_add(1);
        self.last_used_at = Some(at);
        self.last_errors.clear();
        self.consecutive_errors = 0;
        self.tokens_saved_today = self.tokens_saved_today.saturating_add(tokens_saved);
        self.total_tokens_saved = self.total_tokens_saved.saturating_add(tokens_saved);
    }

    /// Clears counters, errors and cooldown; keeps the lifetime token total.
    pub fn reset(&mut self, today: NaiveDate) {
        let total = self.total_tokens_saved;
        *self = Self::new(today);
        self.total_tokens_saved = total;
    }
}

// ============================================================================
// Full State
// ============================================================================

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullState {
    /// Document version.
    pub version: u32,
    /// State by provider id.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderState>,
}

impl Default for FullState {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            providers: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_roll_over_only_on_later_day() {
        let mut state = ProviderState::new(day(1));
        state.record_success(at(1), 50);
        state.out_of_credits_until = Some(at(5));

        assert!(!state.roll_over(day(1)));
        assert_eq!(state.requests_today, 1);

        assert!(state.roll_over(day(2)));
        assert_eq!(state.requests_today, 0);
        assert_eq!(state.tokens_saved_today, 0);
        assert_eq!(state.total_tokens_saved, 50);
        assert!(state.out_of_credits_until.is_none());
        assert_eq!(state.last_reset, day(2));
    }

    #[test]
    fn test_past_cooldown_counts_as_absent() {
        let mut state = ProviderState::new(day(1));
        state.out_of_credits_until = Some(at(2));

        assert!(state.is_out_of_credits(at(1)));
        assert!(!state.is_out_of_credits(at(2)));
        assert!(!state.is_out_of_credits(at(2) + Duration::minutes(1)));
        assert!(state.out_of_credits_until.is_some());
    }

    #[test]
    fn test_error_cap_evicts_oldest() {
        let mut state = ProviderState::new(day(1));
        for i in 0..12 {
            state.push_error(ErrorRecord {
                at: at(0),
                message: format!("TRANSIENT: {i}"),
            });
        }

        assert_eq!(state.last_errors.len(), MAX_LAST_ERRORS);
        assert_eq!(state.last_errors[0].message, "TRANSIENT: 2");
        assert_eq!(state.last_errors[9].message, "TRANSIENT: 11");
        assert_eq!(state.consecutive_errors, 12);
    }

    #[test]
    fn test_success_clears_errors() {
        let mut state = ProviderState::new(day(1));
        state.push_error(ErrorRecord {
            at: at(0),
            message: "TIMEOUT: slow".into(),
        });
        state.record_success(at(1), 7);

        assert!(state.last_errors.is_empty());
        assert_eq!(state.consecutive_errors, 0);
        assert_eq!(state.last_used_at, Some(at(1)));
    }

    #[test]
    fn test_camel_case_document() {
        let mut doc = FullState::default();
        let mut state = ProviderState::new(day(1));
        state.out_of_credits_until = Some(at(3));
        doc.providers.insert("claude".into(), state);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["version"], 1);
        let claude = &json["providers"]["claude"];
        assert_eq!(claude["requestsToday"], 0);
        assert_eq!(claude["lastReset"], "2026-03-01");
        assert!(claude.get("outOfCreditsUntil").is_some());
        assert!(claude.get("totalTokensSaved").is_some());
        assert!(claude.get("lastUsedAt").is_none());
    }
}
