//! Codex (OpenAI) provider preset.
//!
//! Runs `codex exec <prompt>` non-interactively. The final message arrives on
//! stdout line by line; Codex reports token totals as free text, which
//! [`parse_codex_usage`] extracts.

mod descriptor;
pub(crate) mod parser;

pub use descriptor::{CODEX_ID, codex_descriptor};
pub use parser::parse_codex_usage;
