//! Claude provider descriptor.

use coderelay_core::{
    Capability, ErrorKind, ErrorPattern, LaunchConfig, OutputFormat, PromptStyle,
};

use crate::descriptor::ProviderDescriptor;

/// Provider id.
pub const CLAUDE_ID: &str = "claude";

/// Creates the Claude provider descriptor.
pub fn claude_descriptor() -> ProviderDescriptor {
    ProviderDescriptor::builder(CLAUDE_ID, claude_launch())
        .display_name("Claude")
        .capabilities([
            Capability::Generate,
            Capability::Review,
            Capability::Edit,
            Capability::Files,
        ])
        .error_pattern(ErrorPattern::new("credit balance is too low", ErrorKind::OutOfCredits))
        .error_pattern(ErrorPattern::new("usage limit reached", ErrorKind::OutOfCredits))
        .error_pattern(ErrorPattern::new("please run /login", ErrorKind::Unauthorized))
        .error_pattern(ErrorPattern::new("overloaded_error", ErrorKind::Internal))
        .build()
}

/// Claude CLI launch configuration.
fn claude_launch() -> LaunchConfig {
    let mut launch = LaunchConfig::new("claude")
        .with_args(["--output-format", "json"])
        .with_prompt(PromptStyle::Flag { flag: "-p".into() })
        .with_output(OutputFormat::Json {
            text_pointer: "/result".into(),
            usage_pointer: Some("/usage".into()),
        });
    launch.model_flag = Some("--model".into());
    launch
}
