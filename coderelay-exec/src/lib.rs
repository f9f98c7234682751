// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `CodeRelay` Exec
//!
//! Subprocess plumbing for the `CodeRelay` providers.
//!
//! ## Host APIs
//!
//! - [`host::process`] - Runs a CLI tool with an output ceiling, a deadline
//!   and a cancellation token; streams stdout line by line
//! - [`host::lookup`] - Resolves binaries on `PATH`
//!
//! ## Example
//!
//! ```ignore
//! use coderelay_exec::{CommandSpec, ProcessRunner, RunOptions};
//!
//! let spec = CommandSpec::new("claude").args(["-p", "explain this diff"]);
//! let output = ProcessRunner::new().run(&spec, &RunOptions::default()).await?;
//! ```

pub mod error;
pub mod host;

// Errors
pub use error::ProcessError;

// Host APIs
pub use host::{
    lookup::{BinaryLookup, PathLookup},
    process::{
        CommandSpec, ProcessEvent, ProcessOutput, ProcessRunner, ProcessStream, RunOptions,
        strip_ansi_codes,
    },
};
