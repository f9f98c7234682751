// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `CodeRelay` Providers
//!
//! Provider adapters and provider resolution for `CodeRelay`.
//!
//! Every provider is a CLI tool driven by a [`LaunchConfig`]. Each built-in
//! preset module includes:
//!
//! - **Descriptor**: Display name, capabilities, default launch config
//! - **Patterns**: Tool-specific failure phrases, checked before the defaults
//! - **Parser**: Usage extraction where the tool reports tokens as free text
//!
//! ## Built-in Presets
//!
//! | Provider | Prompt | Output | Usage source | Streaming |
//! |----------|--------|--------|--------------|-----------|
//! | Claude   | `-p`   | JSON (`/result`) | `/usage` object | No |
//! | Codex    | arg    | text   | "tokens used" summary | Lines |
//! | Gemini   | `-p`   | JSON (`/response`) | `stats.models` | No |
//!
//! Any other id is served by a generic [`CliProvider`] built from the user's
//! launch config, or by a constructor registered on the [`ProviderFactory`].
//!
//! ## Usage
//!
//! ```ignore
//! use coderelay_providers::ProviderFactory;
//!
//! let factory = ProviderFactory::with_path_lookup(Arc::new(config));
//! if let Some(provider) = factory.get_provider("claude").await {
//!     let response = provider.run_once(&request, &options).await?;
//! }
//! ```
//!
//! [`LaunchConfig`]: coderelay_core::LaunchConfig

pub mod cli_provider;
pub mod descriptor;
pub mod factory;
pub mod registry;

// Provider presets (alphabetical)
pub mod claude;
pub mod codex;
pub mod gemini;

// Re-export key types
pub use cli_provider::{CliProvider, usage_from_value};
pub use descriptor::{ProviderDescriptor, ProviderDescriptorBuilder, UsageParser};
pub use factory::{ProviderConstructor, ProviderFactory};
pub use registry::{native_descriptor, native_descriptors, native_ids};

// Re-export preset descriptors
pub use claude::{CLAUDE_ID, claude_descriptor};
pub use codex::{CODEX_ID, codex_descriptor};
pub use gemini::{GEMINI_ID, gemini_descriptor};

#[cfg(test)]
mod cli_provider_tests;
