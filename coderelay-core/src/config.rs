//! Configuration types.
//!
//! The config document is produced by an external discovery/merging step;
//! this module only describes its shape and loads one already-located file.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::classify::ErrorPattern;
use crate::error::CoreError;

// ============================================================================
// App Config
// ============================================================================

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Candidate ordering.
    pub routing: RoutingConfig,
    /// Per-provider launch configuration.
    pub providers: HashMap<String, LaunchConfig>,
    /// Per-provider credit budgets.
    pub credits: CreditsConfig,
}

impl AppConfig {
    /// Loads configuration from a specific path.
    ///
    /// A missing file yields the default configuration. The format is picked
    /// from the extension: `.json`, `.yaml` or `.yml`.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            Some("yaml" | "yml") => Self::from_yaml_str(&content)?,
            other => {
                return Err(CoreError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ));
            }
        };

        config.validate()?;
        info!(path = %path.display(), providers = config.providers.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parses a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self, CoreError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (id, launch) in &self.providers {
            if launch.command.trim().is_empty() {
                return Err(CoreError::InvalidConfig(format!(
                    "provider '{id}' has an empty command"
                )));
            }
        }

        for (id, policy) in &self.credits.providers {
            if let CreditPolicy::Daily { reset_hour_utc, .. } = policy {
                if *reset_hour_utc > 23 {
                    return Err(CoreError::InvalidConfig(format!(
                        "provider '{id}' has resetHourUtc {reset_hour_utc}, expected 0-23"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Returns the credit policy for a provider, if any.
    pub fn credit_policy(&self, id: &str) -> Option<&CreditPolicy> {
        self.credits.providers.get(id)
    }

    /// Returns the launch configuration for a provider, if any.
    pub fn launch_config(&self, id: &str) -> Option<&LaunchConfig> {
        self.providers.get(id)
    }
}

// ============================================================================
// Routing Config
// ============================================================================

/// Candidate ordering configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingConfig {
    /// Order used when no mode override applies.
    pub default_order: Vec<String>,
    /// Mode name to ordered provider ids.
    pub per_mode_override: HashMap<String, Vec<String>>,
}

impl RoutingConfig {
    /// Returns the configured order for a mode.
    pub fn order_for(&self, mode: &str) -> &[String] {
        self.per_mode_override
            .get(mode)
            .unwrap_or(&self.default_order)
    }
}

// ============================================================================
// Credits Config
// ============================================================================

/// Credit budget configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditsConfig {
    /// Provider id to policy.
    pub providers: HashMap<String, CreditPolicy>,
}

/// Budget policy for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreditPolicy {
    /// Locally enforced daily request budget.
    Daily {
        /// Requests allowed per day.
        #[serde(rename = "dailyRequestLimit")]
        daily_request_limit: u32,
        /// UTC hour at which the budget renews.
        #[serde(rename = "resetHourUtc", default)]
        reset_hour_utc: u8,
    },
    /// Externally managed plan; no local limit.
    Plan {
        /// Plan name, informational only.
        plan: String,
    },
}

impl CreditPolicy {
    /// Returns the daily request limit, if this policy enforces one.
    pub fn daily_limit(&self) -> Option<u32> {
        match self {
            Self::Daily {
                daily_request_limit,
                ..
            } => Some(*daily_request_limit),
            Self::Plan { .. } => None,
        }
    }

    /// Returns the next budget renewal strictly after `now`.
    ///
    /// Plans without a local limit renew at the next UTC midnight.
    pub fn next_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let hour = match self {
            Self::Daily { reset_hour_utc, .. } => u32::from(*reset_hour_utc).min(23),
            Self::Plan { .. } => 0,
        };
        next_utc_hour(now, hour)
    }
}

/// Returns the next occurrence of `hour:00:00 UTC` strictly after `now`.
pub fn next_utc_hour(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(time).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

// ============================================================================
// Launch Config
// ============================================================================

/// How to launch one provider's command-line tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    /// Binary name (looked up on PATH) or path.
    pub command: String,
    /// Fixed arguments placed before the prompt.
    #[serde(default)]
    pub args: Vec<String>,
    /// How the prompt is delivered.
    #[serde(default)]
    pub prompt: PromptStyle,
    /// Flag used to pass `params.model`.
    #[serde(default)]
    pub model_flag: Option<String>,
    /// Flag repeated once per context file.
    #[serde(default)]
    pub file_flag: Option<String>,
    /// How to read the tool's output.
    #[serde(default)]
    pub output: OutputFormat,
    /// Extra environment variables.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Per-invocation timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Display name override.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Provider-specific classification patterns.
    #[serde(default)]
    pub error_patterns: Vec<ErrorPattern>,
    /// Whether the generic patterns apply after the provider's own.
    #[serde(default = "default_true")]
    pub default_patterns: bool,
    /// Whether stdout lines should be forwarded as deltas.
    #[serde(default)]
    pub streaming: bool,
}

fn default_true() -> bool {
    true
}

impl LaunchConfig {
    /// Creates a minimal launch config for a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            prompt: PromptStyle::default(),
            model_flag: None,
            file_flag: None,
            output: OutputFormat::default(),
            env: HashMap::new(),
            timeout_secs: None,
            display_name: None,
            error_patterns: Vec::new(),
            default_patterns: true,
            streaming: false,
        }
    }

    /// Sets the fixed arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the prompt style.
    pub fn with_prompt(mut self, prompt: PromptStyle) -> Self {
        self.prompt = prompt;
        self
    }

    /// Sets the output format.
    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }
}

/// Prompt delivery style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum PromptStyle {
    /// Prompt is the last positional argument.
    #[default]
    Arg,
    /// Prompt follows a flag, e.g. `-p <prompt>`.
    Flag {
        /// The flag.
        flag: String,
    },
    /// Prompt is written to stdin.
    Stdin,
}

/// Output interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum OutputFormat {
    /// Stdout is the response text.
    #[default]
    Text,
    /// Stdout is one JSON document.
    Json {
        /// JSON pointer to the response text (e.g. `/result`).
        #[serde(rename = "textPointer")]
        text_pointer: String,
        /// JSON pointer to a usage object with input/output token counts.
        #[serde(rename = "usagePointer", default)]
        usage_pointer: Option<String>,
    },
}

impl OutputFormat {
    /// Returns true for JSON output.
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_order_for_mode() {
        let routing = RoutingConfig {
            default_order: vec!["a".into(), "b".into()],
            per_mode_override: HashMap::from([("review".into(), vec!["c".into()])]),
        };
        assert_eq!(routing.order_for("review"), ["c".to_string()]);
        assert_eq!(routing.order_for("general"), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_credit_policy_untagged() {
        let json = r#"{"providers": {
            "a": {"dailyRequestLimit": 50, "resetHourUtc": 7},
            "b": {"plan": "max"},
            "c": {"dailyRequestLimit": 10}
        }}"#;
        let credits: CreditsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(credits.providers["a"].daily_limit(), Some(50));
        assert_eq!(credits.providers["b"].daily_limit(), None);
        assert_eq!(
            credits.providers["c"],
            CreditPolicy::Daily {
                daily_request_limit: 10,
                reset_hour_utc: 0
            }
        );
    }

    #[test]
    fn test_next_reset_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 30, 0).unwrap();
        let policy = CreditPolicy::Daily {
            daily_request_limit: 1,
            reset_hour_utc: 0,
        };
        assert_eq!(
            policy.next_reset(now),
            Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_reset_later_today() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 5, 0, 0).unwrap();
        let policy = CreditPolicy::Daily {
            daily_request_limit: 1,
            reset_hour_utc: 7,
        };
        assert_eq!(
            policy.next_reset(now),
            Utc.with_ymd_and_hms(2026, 3, 14, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_utc_hour_is_strictly_after() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        assert_eq!(
            next_utc_hour(now, 0),
            Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let mut config = AppConfig::default();
        config.providers.insert("x".into(), LaunchConfig::new("  "));
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_reset_hour() {
        let mut config = AppConfig::default();
        config.credits.providers.insert(
            "x".into(),
            CreditPolicy::Daily {
                daily_request_limit: 5,
                reset_hour_utc: 24,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_launch_config_defaults() {
        let launch: LaunchConfig = serde_json::from_str(r#"{"command": "mytool"}"#).unwrap();
        assert_eq!(launch.prompt, PromptStyle::Arg);
        assert_eq!(launch.output, OutputFormat::Text);
        assert!(launch.default_patterns);
        assert!(!launch.streaming);
    }
}
