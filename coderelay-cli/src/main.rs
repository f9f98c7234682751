// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! CodeRelay CLI - route coding requests across local assistant tools.
//!
//! # Examples
//!
//! ```bash
//! # Route a prompt through the configured default order
//! coderelay route "add unit tests for the parser"
//!
//! # Use the order configured for a mode, streaming output
//! coderelay route --mode review --stream "review src/lib.rs"
//!
//! # Force one provider
//! coderelay route --provider codex "fix the build"
//!
//! # Per-provider counters and cooldowns
//! coderelay status --format json --pretty
//!
//! # Clear one provider's cooldown
//! coderelay reset --provider claude
//!
//! # List providers and whether their tools are installed
//! coderelay providers
//! ```

mod app;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{providers, reset, route, status};

// ============================================================================
// CLI Definition
// ============================================================================

/// CodeRelay CLI - priority routing and failover for coding assistants.
#[derive(Parser)]
#[command(name = "coderelay")]
#[command(about = "Route coding requests across local assistant CLIs")]
#[command(long_about = r#"
CodeRelay sends a coding request to the first available assistant CLI in a
configured priority order, and fails over when a tool is out of credits,
rate limited, missing or flaky.

Built-in providers:
  • Claude Code (claude)
  • OpenAI Codex (codex)
  • Google Gemini (gemini)

Any other tool can be added under `providers` in the config file.

Examples:
  coderelay route "explain this stack trace"
  coderelay route --mode review --stream "review the diff"
  coderelay status
  coderelay reset --provider claude
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (JSON or YAML). Defaults to the per-user config path.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// State file. Defaults to the per-user data path.
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Route a prompt to the first provider that answers.
    #[command(visible_alias = "r")]
    Route(route::RouteArgs),

    /// Show per-provider counters, errors and cooldowns.
    #[command(visible_alias = "s")]
    Status(status::StatusArgs),

    /// Clear provider state.
    Reset(reset::ResetArgs),

    /// List known providers.
    #[command(visible_alias = "p")]
    Providers,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Every provider was missing, cooling down or failed.
    ProvidersExhausted = 2,
    /// A provider rejected the request itself.
    Rejected = 3,
    /// The last provider tried timed out.
    Timeout = 4,
    /// Interrupted by the user.
    Interrupted = 130,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("coderelay=debug,info")
    } else {
        EnvFilter::new("coderelay=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Route(args) => route::run(args, &cli).await,
        Commands::Status(args) => status::run(args, &cli).await,
        Commands::Reset(args) => reset::run(args, &cli).await,
        Commands::Providers => providers::run(&cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}
