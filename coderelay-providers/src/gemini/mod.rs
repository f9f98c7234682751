//! Gemini (Google) provider preset.
//!
//! Runs `gemini -p <prompt> --output-format json`. The answer is the
//! `response` field; token counts are reported per model under `stats`.

mod descriptor;
pub(crate) mod parser;

pub use descriptor::{GEMINI_ID, gemini_descriptor};
pub use parser::parse_gemini_usage;
