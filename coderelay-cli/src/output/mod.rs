//! Output formatting for CLI.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use coderelay_store::ProviderState;

/// One line of `coderelay providers`.
#[derive(Debug, Clone)]
pub struct ProviderRow {
    pub id: String,
    pub display_name: String,
    pub binary: String,
    pub source: ProviderSource,
    pub installed: bool,
    pub streaming: bool,
}

/// Where a provider definition comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSource {
    /// Built-in preset, possibly overridden by config.
    Native,
    /// Defined only in the config file.
    Configured,
}

impl ProviderSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Configured => "config",
        }
    }
}

/// One entry of `coderelay status`.
#[derive(Debug, Clone)]
pub struct StatusRow {
    pub id: String,
    pub state: ProviderState,
    pub daily_limit: Option<u32>,
}

#[cfg(test)]
mod tests;
