//! Built-in provider presets.
//!
//! The table is rebuilt on each call; the [`ProviderFactory`] takes one copy
//! at construction and owns it from then on.
//!
//! [`ProviderFactory`]: crate::factory::ProviderFactory

use crate::claude::claude_descriptor;
use crate::codex::codex_descriptor;
use crate::descriptor::ProviderDescriptor;
use crate::gemini::gemini_descriptor;

/// Returns every native preset, in default priority order.
pub fn native_descriptors() -> Vec<ProviderDescriptor> {
    vec![claude_descriptor(), codex_descriptor(), gemini_descriptor()]
}

/// Gets a native preset by id.
pub fn native_descriptor(id: &str) -> Option<ProviderDescriptor> {
    native_descriptors().into_iter().find(|d| d.id == id)
}

/// Returns the native preset ids.
pub fn native_ids() -> Vec<String> {
    native_descriptors().into_iter().map(|d| d.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_native_presets() {
        assert_eq!(native_ids(), vec!["claude", "codex", "gemini"]);
    }

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(native_descriptor("codex").unwrap().cli_name(), "codex");
        assert!(native_descriptor("cursor").is_none());
    }

    #[test]
    fn test_binaries_match_ids() {
        for desc in native_descriptors() {
            assert_eq!(desc.cli_name(), desc.id);
        }
    }
}
