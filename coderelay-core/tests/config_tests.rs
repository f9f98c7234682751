//! Integration tests for configuration loading.

use coderelay_core::{AppConfig, CoreError, CreditPolicy, ErrorKind, OutputFormat, PromptStyle};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load_from(&dir.path().join("absent.json")).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_load_json_document() {
    let file = write_temp(
        ".json",
        r#"{
            "routing": {
                "defaultOrder": ["claude", "codex"],
                "perModeOverride": {"review": ["gemini"]}
            },
            "providers": {
                "local": {
                    "command": "mytool",
                    "args": ["--quiet"],
                    "prompt": {"style": "flag", "flag": "-p"},
                    "output": {"format": "json", "textPointer": "/answer"},
                    "errorPatterns": [{"pattern": "Slow Down", "kind": "RATE_LIMIT"}]
                }
            },
            "credits": {"providers": {"claude": {"dailyRequestLimit": 100, "resetHourUtc": 6}}}
        }"#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert_eq!(config.routing.order_for("review"), ["gemini".to_string()]);
    assert_eq!(config.routing.order_for("general").len(), 2);

    let local = config.launch_config("local").unwrap();
    assert_eq!(local.prompt, PromptStyle::Flag { flag: "-p".into() });
    assert!(matches!(&local.output, OutputFormat::Json { text_pointer, .. } if text_pointer == "/answer"));
    assert_eq!(local.error_patterns[0].kind, ErrorKind::RateLimit);

    assert_eq!(
        config.credit_policy("claude"),
        Some(&CreditPolicy::Daily {
            daily_request_limit: 100,
            reset_hour_utc: 6
        })
    );
}

#[test]
fn test_load_yaml_document() {
    let file = write_temp(
        ".yaml",
        "routing:\n  defaultOrder: [codex]\ncredits:\n  providers:\n    codex:\n      plan: pro\n",
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert_eq!(config.routing.default_order, vec!["codex".to_string()]);
    assert_eq!(config.credit_policy("codex").and_then(CreditPolicy::daily_limit), None);
}

#[test]
fn test_unknown_extension_rejected() {
    let file = write_temp(".toml", "x = 1");
    assert!(matches!(
        AppConfig::load_from(file.path()),
        Err(CoreError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_invalid_json_is_an_error() {
    let file = write_temp(".json", "{ not json");
    assert!(matches!(
        AppConfig::load_from(file.path()),
        Err(CoreError::Serialization(_))
    ));
}

#[test]
fn test_load_validates_document() {
    let file = write_temp(
        ".json",
        r#"{"credits": {"providers": {"claude": {"dailyRequestLimit": 10, "resetHourUtc": 24}}}}"#,
    );
    assert!(matches!(
        AppConfig::load_from(file.path()),
        Err(CoreError::InvalidConfig(_))
    ));
}
