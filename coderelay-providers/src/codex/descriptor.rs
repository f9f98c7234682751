//! Codex provider descriptor.

use coderelay_core::{Capability, ErrorKind, ErrorPattern, LaunchConfig};

use super::parser::parse_codex_usage;
use crate::descriptor::ProviderDescriptor;

/// Provider id.
pub const CODEX_ID: &str = "codex";

/// Creates the Codex provider descriptor.
pub fn codex_descriptor() -> ProviderDescriptor {
    ProviderDescriptor::builder(CODEX_ID, codex_launch())
        .display_name("Codex")
        .capabilities([Capability::Generate, Capability::Edit, Capability::Review])
        .error_pattern(ErrorPattern::new("you've hit your usage limit", ErrorKind::OutOfCredits))
        .error_pattern(ErrorPattern::new("stream disconnected before completion", ErrorKind::Transient))
        .error_pattern(ErrorPattern::new("not inside a trusted directory", ErrorKind::Forbidden))
        .usage_parser(parse_codex_usage)
        .build()
}

/// Codex CLI launch configuration.
fn codex_launch() -> LaunchConfig {
    let mut launch = LaunchConfig::new("codex").with_args(["exec", "--skip-git-repo-check"]);
    launch.model_flag = Some("--model".into());
    launch.streaming = true;
    launch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codex_descriptor() {
        let desc = codex_descriptor();
        assert_eq!(desc.cli_name(), "codex");
        assert!(desc.launch.streaming);
        assert!(desc.usage_parser.is_some());
    }
}
