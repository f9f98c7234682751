//! Provider descriptor system.
//!
//! A descriptor contains all the static configuration for a provider:
//! - Display name and capabilities
//! - The default launch configuration for its CLI tool
//! - Provider-specific classification patterns
//! - An optional usage parser for tools that report tokens in free text

use coderelay_core::{Capability, ErrorPattern, LaunchConfig, Usage};
use coderelay_exec::ProcessOutput;

/// Extracts token usage from a finished process.
pub type UsageParser = fn(&ProcessOutput) -> Option<Usage>;

// ============================================================================
// Provider Descriptor
// ============================================================================

/// Complete descriptor for a provider.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Provider identifier.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// How to launch the tool.
    pub launch: LaunchConfig,
    /// Classification patterns checked before the launch config's own
    /// defaults.
    pub error_patterns: Vec<ErrorPattern>,
    /// Advertised capabilities.
    pub capabilities: Vec<Capability>,
    /// Fallback usage extraction when the output carries no usage pointer.
    pub usage_parser: Option<UsageParser>,
}

impl ProviderDescriptor {
    /// Creates a new descriptor builder.
    pub fn builder(id: impl Into<String>, launch: LaunchConfig) -> ProviderDescriptorBuilder {
        ProviderDescriptorBuilder::new(id, launch)
    }

    /// Descriptor for a tool known only through its launch config.
    pub fn from_launch(id: impl Into<String>, launch: LaunchConfig) -> Self {
        Self::builder(id, launch).build()
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the CLI binary.
    pub fn cli_name(&self) -> &str {
        &self.launch.command
    }

    /// Applies a user launch config on top of a preset.
    ///
    /// The override replaces the launch config wholesale; the preset keeps
    /// its patterns, capabilities and usage parser, and its display name
    /// unless the override names one.
    pub fn with_launch_override(mut self, launch: Option<&LaunchConfig>) -> Self {
        if let Some(launch) = launch {
            if let Some(name) = &launch.display_name {
                self.display_name.clone_from(name);
            }
            self.launch = launch.clone();
        }
        self
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ProviderDescriptor`].
pub struct ProviderDescriptorBuilder {
    id: String,
    display_name: Option<String>,
    launch: LaunchConfig,
    error_patterns: Vec<ErrorPattern>,
    capabilities: Vec<Capability>,
    usage_parser: Option<UsageParser>,
}

impl ProviderDescriptorBuilder {
    /// Creates a new builder for the given provider.
    pub fn new(id: impl Into<String>, launch: LaunchConfig) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            launch,
            error_patterns: Vec::new(),
            capabilities: vec![Capability::Generate],
            usage_parser: None,
        }
    }

    /// Sets the display name.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Adds a classification pattern.
    pub fn error_pattern(mut self, pattern: ErrorPattern) -> Self {
        self.error_patterns.push(pattern);
        self
    }

    /// Sets the capabilities.
    pub fn capabilities(mut self, capabilities: impl Into<Vec<Capability>>) -> Self {
        self.capabilities = capabilities.into();
        self
    }

    /// Sets the usage parser.
    pub fn usage_parser(mut self, parser: UsageParser) -> Self {
        self.usage_parser = Some(parser);
        self
    }

    /// Builds the descriptor.
    pub fn build(self) -> ProviderDescriptor {
        let display_name = self
            .display_name
            .or_else(|| self.launch.display_name.clone())
            .unwrap_or_else(|| self.id.clone());
        ProviderDescriptor {
            id: self.id,
            display_name,
            launch: self.launch,
            error_patterns: self.error_patterns,
            capabilities: self.capabilities,
            usage_parser: self.usage_parser,
        }
    }
}
