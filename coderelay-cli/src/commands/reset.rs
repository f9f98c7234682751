//! Reset command - clear counters, errors and cooldowns.

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::app::App;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the reset command.
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Reset only this provider. Without it every provider is reset.
    #[arg(long, short)]
    pub provider: Option<String>,
}

/// Runs the reset command.
///
/// A single-provider reset keeps that provider's lifetime token total.
pub async fn run(args: &ResetArgs, cli: &Cli) -> Result<ExitCode> {
    let app = App::load(cli).await?;

    match &args.provider {
        Some(id) => {
            info!(provider = %id, "Resetting provider");
            app.state.reset_provider(id).await;
        }
        None => {
            info!("Resetting all providers");
            app.state.reset_all().await;
        }
    }
    app.state.flush().await;

    if cli.quiet {
        return Ok(ExitCode::Success);
    }

    let target = args.provider.as_deref().unwrap_or("all providers");
    match cli.format {
        OutputFormat::Text => println!("Reset {target}"),
        OutputFormat::Json => println!("{}", serde_json::json!({ "reset": target })),
    }

    Ok(ExitCode::Success)
}
