//! Providers command - list known providers.

use anyhow::Result;
use coderelay_providers::native_descriptor;
use tracing::info;

use crate::app::App;
use crate::output::{JsonFormatter, ProviderRow, ProviderSource, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the providers command.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    info!("Listing providers");

    let app = App::load(cli).await?;
    let rows = rows(&app).await;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            println!("{}", formatter.format_providers_header());
            println!("{}", "─".repeat(70));

            for row in &rows {
                println!("{}", formatter.format_provider_line(row));
            }

            println!();
            println!(
                "Total: {} providers ({} installed)",
                rows.len(),
                rows.iter().filter(|r| r.installed).count()
            );
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_providers(&rows)?);
        }
    }

    Ok(ExitCode::Success)
}

async fn rows(app: &App) -> Vec<ProviderRow> {
    let mut rows = Vec::new();
    for id in app.factory.known_ids() {
        let source = if app.factory.is_native(&id) {
            ProviderSource::Native
        } else {
            ProviderSource::Configured
        };

        let row = match app.factory.get_provider(&id).await {
            Some(provider) => ProviderRow {
                display_name: provider.display_name().to_string(),
                binary: provider.binary().to_string(),
                streaming: provider.supports_streaming(),
                installed: true,
                source,
                id,
            },
            None => {
                let preset = native_descriptor(&id);
                let binary = app
                    .config()
                    .launch_config(&id)
                    .or(preset.as_ref().map(|d| &d.launch))
                    .map_or_else(|| id.clone(), |launch| launch.command.clone());
                ProviderRow {
                    display_name: preset.map_or_else(|| id.clone(), |d| d.display_name),
                    binary,
                    streaming: false,
                    installed: false,
                    source,
                    id,
                }
            }
        };
        rows.push(row);
    }
    rows
}
