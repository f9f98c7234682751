//! Gemini provider descriptor.

use coderelay_core::{
    Capability, ErrorKind, ErrorPattern, LaunchConfig, OutputFormat, PromptStyle,
};

use super::parser::parse_gemini_usage;
use crate::descriptor::ProviderDescriptor;

/// Provider id.
pub const GEMINI_ID: &str = "gemini";

/// Creates the Gemini provider descriptor.
pub fn gemini_descriptor() -> ProviderDescriptor {
    ProviderDescriptor::builder(GEMINI_ID, gemini_launch())
        .display_name("Gemini")
        .capabilities([Capability::Generate, Capability::Review, Capability::Files])
        .error_pattern(ErrorPattern::new("exhausted your daily quota", ErrorKind::OutOfCredits))
        .error_pattern(ErrorPattern::new("please set an auth method", ErrorKind::Unauthorized))
        .error_pattern(ErrorPattern::new("gemini_api_key", ErrorKind::Unauthorized))
        .usage_parser(parse_gemini_usage)
        .build()
}

/// Gemini CLI launch configuration.
fn gemini_launch() -> LaunchConfig {
    let mut launch = LaunchConfig::new("gemini")
        .with_args(["--output-format", "json"])
        .with_prompt(PromptStyle::Flag { flag: "-p".into() })
        .with_output(OutputFormat::Json {
            text_pointer: "/response".into(),
            usage_pointer: None,
        });
    launch.model_flag = Some("--model".into());
    launch
}
