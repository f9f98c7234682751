//! Route command - send a prompt to the first provider that answers.

use anyhow::Result;
use clap::Args;
use coderelay_core::{CodingRequest, ErrorKind, InvokeOptions};
use coderelay_router::{RouteError, RouteEvent};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::App;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// How often dirty state is written while a request is running.
const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Arguments for the route command.
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// The prompt to send.
    pub prompt: String,

    /// Task mode; selects the mode's provider order if one is configured.
    #[arg(long, short)]
    pub mode: Option<String>,

    /// Send to this provider only, bypassing the configured order.
    #[arg(long, short)]
    pub provider: Option<String>,

    /// Print output as it arrives.
    #[arg(long)]
    pub stream: bool,

    /// Per-provider timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Context file to hand to the provider (repeatable).
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Model override, for providers that accept one.
    #[arg(long)]
    pub model: Option<String>,

    /// Print the candidate order without invoking anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl RouteArgs {
    fn request(&self) -> CodingRequest {
        let mut request = CodingRequest::new(self.prompt.clone());
        if let Some(mode) = &self.mode {
            request = request.with_mode(mode.clone());
        }
        if let Some(provider) = &self.provider {
            request = request.with_provider(provider.clone());
        }
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }
        for file in &self.files {
            request = request.with_file(file.clone());
        }
        request
    }

    fn options(&self, cancel: CancellationToken) -> InvokeOptions {
        let options = InvokeOptions::with_cancel(cancel);
        match self.timeout {
            Some(secs) => options.timeout(Duration::from_secs(secs)),
            None => options,
        }
    }
}

/// Runs the route command.
pub async fn run(args: &RouteArgs, cli: &Cli) -> Result<ExitCode> {
    let app = App::load(cli).await?;
    let request = args.request();

    if args.dry_run {
        return dry_run(&app, &request, cli);
    }

    info!(mode = %request.mode, "Routing prompt");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received");
            interrupt.cancel();
        }
    });

    let autosave_cancel = CancellationToken::new();
    let autosave = Arc::clone(&app.state).spawn_autosave(AUTOSAVE_INTERVAL, autosave_cancel.clone());

    let options = args.options(cancel);
    let result = if args.stream {
        run_streaming(&app, request, options, cli).await
    } else {
        run_blocking(&app, &request, &options, cli).await
    };

    autosave_cancel.cancel();
    if let Err(e) = autosave.await {
        debug!(error = %e, "Autosave task failed");
    }
    app.state.flush().await;

    result
}

fn dry_run(app: &App, request: &CodingRequest, cli: &Cli) -> Result<ExitCode> {
    match app.router.candidates(request) {
        Ok(candidates) => {
            match cli.format {
                OutputFormat::Text => {
                    println!("{}", TextFormatter::new(!cli.no_color).format_candidates(&candidates));
                }
                OutputFormat::Json => {
                    println!("{}", JsonFormatter::new(cli.pretty).format_candidates(&candidates)?);
                }
            }
            Ok(ExitCode::Success)
        }
        Err(error) => report_error(&error, cli),
    }
}

// ============================================================================
// Blocking
// ============================================================================

async fn run_blocking(
    app: &App,
    request: &CodingRequest,
    options: &InvokeOptions,
    cli: &Cli,
) -> Result<ExitCode> {
    match app.router.route(request, options).await {
        Ok(response) => {
            match cli.format {
                OutputFormat::Text => {
                    println!("{}", response.text);
                    if !cli.quiet {
                        let formatter = TextFormatter::new(!cli.no_color);
                        eprintln!("{}", formatter.format_route_footer(&response));
                    }
                }
                OutputFormat::Json => {
                    println!("{}", JsonFormatter::new(cli.pretty).format_response(&response)?);
                }
            }
            Ok(ExitCode::Success)
        }
        Err(error) => report_error(&error, cli),
    }
}

// ============================================================================
// Streaming
// ============================================================================

async fn run_streaming(
    app: &App,
    request: CodingRequest,
    options: InvokeOptions,
    cli: &Cli,
) -> Result<ExitCode> {
    let mut events = app.router.route_stream(request, options);
    let text = TextFormatter::new(!cli.no_color);
    let json = JsonFormatter::new(cli.pretty);
    let mut stdout = std::io::stdout();
    let mut code = ExitCode::Success;
    // Whether the current candidate has written any text yet.
    let mut printed = false;

    while let Some(event) = events.next().await {
        if cli.format == OutputFormat::Json {
            writeln!(stdout, "{}", json.format_event(&event)?)?;
            stdout.flush()?;
            if let RouteEvent::Failed(error) = &event {
                code = exit_code_for(error);
            }
            continue;
        }

        match event {
            RouteEvent::Attempt { provider } => {
                debug!(provider = %provider, "Attempting");
                printed = false;
            }
            RouteEvent::Delta { text: delta, .. } => {
                printed = true;
                write!(stdout, "{delta}")?;
                stdout.flush()?;
            }
            RouteEvent::Chunk { .. } => {}
            RouteEvent::Failover {
                provider,
                kind,
                message,
            } => {
                if printed {
                    writeln!(stdout)?;
                }
                if !cli.quiet {
                    eprintln!("{}", text.format_failover(&provider, kind, &message));
                }
            }
            RouteEvent::Complete(response) => {
                // Providers without incremental output deliver everything here.
                if !printed {
                    write!(stdout, "{}", response.text)?;
                }
                writeln!(stdout)?;
                if !cli.quiet {
                    eprintln!("{}", text.format_route_footer(&response));
                }
            }
            RouteEvent::Failed(error) => {
                if printed {
                    writeln!(stdout)?;
                }
                code = report_error(&error, cli)?;
            }
        }
    }

    Ok(code)
}

// ============================================================================
// Errors
// ============================================================================

fn report_error(error: &RouteError, cli: &Cli) -> Result<ExitCode> {
    match cli.format {
        OutputFormat::Text => {
            if !cli.quiet {
                eprintln!("{}", TextFormatter::new(!cli.no_color).format_route_error(error));
            }
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_route_error(error)?);
        }
    }
    Ok(exit_code_for(error))
}

/// Maps a routing failure to the process exit code.
pub fn exit_code_for(error: &RouteError) -> ExitCode {
    match error {
        RouteError::Aborted => ExitCode::Interrupted,
        RouteError::Rejected { .. } => ExitCode::Rejected,
        RouteError::Exhausted { .. } if error.kind() == Some(ErrorKind::Timeout) => ExitCode::Timeout,
        RouteError::Exhausted { .. } => ExitCode::ProvidersExhausted,
        RouteError::Config(_) => ExitCode::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderelay_router::Attempt;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&RouteError::Aborted), ExitCode::Interrupted);
        assert_eq!(exit_code_for(&RouteError::Config("x".into())), ExitCode::Error);
        assert_eq!(
            exit_code_for(&RouteError::Rejected {
                provider: "claude".into(),
                kind: ErrorKind::BadRequest,
                message: "bad".into(),
            }),
            ExitCode::Rejected
        );

        let exhausted = RouteError::Exhausted {
            attempts: vec![Attempt::failure(
                "claude",
                ErrorKind::Transient,
                "boom",
                Duration::ZERO,
            )],
        };
        assert_eq!(exit_code_for(&exhausted), ExitCode::ProvidersExhausted);

        let timed_out = RouteError::Exhausted {
            attempts: vec![Attempt::failure(
                "claude",
                ErrorKind::Timeout,
                "timed out",
                Duration::ZERO,
            )],
        };
        assert_eq!(exit_code_for(&timed_out), ExitCode::Timeout);
    }
}
