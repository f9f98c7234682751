//! Status command - per-provider counters, errors and cooldowns.

use anyhow::Result;
use clap::Args;
use std::collections::BTreeSet;
use tracing::info;

use crate::app::App;
use crate::output::{JsonFormatter, StatusRow, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show only this provider.
    #[arg(long, short)]
    pub provider: Option<String>,
}

/// Runs the status command.
pub async fn run(args: &StatusArgs, cli: &Cli) -> Result<ExitCode> {
    let app = App::load(cli).await?;
    let now = app.clock.now();

    let ids: Vec<String> = match &args.provider {
        Some(id) => vec![id.clone()],
        None => {
            // Providers with recorded state may no longer be configured.
            let snapshot = app.state.snapshot().await;
            app.factory
                .known_ids()
                .into_iter()
                .chain(snapshot.providers.into_keys())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }
    };

    info!(providers = ids.len(), "Showing status");

    let mut rows = Vec::with_capacity(ids.len());
    for id in ids {
        let state = app.state.get_provider_state(&id).await;
        let daily_limit = app.config().credit_policy(&id).and_then(|p| p.daily_limit());
        rows.push(StatusRow {
            id,
            state,
            daily_limit,
        });
    }

    // Reading may have rolled a day over.
    app.state.flush().await;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let blocks: Vec<String> = rows.iter().map(|row| formatter.format_status(row, now)).collect();
            println!("{}", blocks.join("\n\n"));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_status(&rows, now)?);
        }
    }

    Ok(ExitCode::Success)
}
