//! Claude (Anthropic) provider preset.
//!
//! Runs `claude -p <prompt> --output-format json` and reads the `result`
//! field of the JSON document. Token usage comes from the `usage` object.

mod descriptor;

pub use descriptor::{CLAUDE_ID, claude_descriptor};
