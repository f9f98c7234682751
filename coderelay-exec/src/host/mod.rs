//! Host APIs for CodeRelay providers.
//!
//! - [`process`] - Subprocess execution for CLI tools
//! - [`lookup`] - Binary lookup on PATH

pub mod lookup;
pub mod process;

// Re-export key types
pub use lookup::{BinaryLookup, PathLookup};
pub use process::{
    CommandSpec, ProcessEvent, ProcessOutput, ProcessRunner, ProcessStream, RunOptions,
};
