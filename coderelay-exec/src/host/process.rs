//! Subprocess execution for CLI tools.
//!
//! Runs an external command with captured output, an output ceiling, a
//! deadline and a cancellation token. Every exit path other than a normal
//! exit kills the child; children are also spawned with `kill_on_drop` so a
//! dropped stream never leaks a process.

use coderelay_core::{DEFAULT_MAX_OUTPUT_BYTES, FailureContext, InvokeOptions};
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::ProcessError;

/// Buffer size for reading from the child's pipes.
const READ_BUFFER_SIZE: usize = 8192;

// ============================================================================
// Command Spec
// ============================================================================

/// A fully resolved command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Extra environment variables.
    pub env: HashMap<String, String>,
    /// Data written to stdin, after which stdin is closed.
    pub stdin: Option<String>,
    /// Working directory.
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    /// Creates a spec for a program with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets one environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the stdin payload.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Sets the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

// ============================================================================
// Run Options
// ============================================================================

/// Limits applied to one execution.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Deadline for the whole execution.
    pub timeout: Option<Duration>,
    /// Kills the child when cancelled.
    pub cancel: CancellationToken,
    /// Ceiling on combined stdout and stderr.
    pub max_output_bytes: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            cancel: CancellationToken::new(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl RunOptions {
    /// Derives run options from invocation options.
    ///
    /// The caller's timeout wins over `fallback_timeout`.
    pub fn from_invoke(options: &InvokeOptions, fallback_timeout: Option<Duration>) -> Self {
        Self {
            timeout: options.timeout.or(fallback_timeout),
            cancel: options.cancel.clone(),
            max_output_bytes: options.max_output_bytes,
        }
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Process Output
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Standard output content, ANSI-stripped.
    pub stdout: String,
    /// Standard error content, ANSI-stripped.
    pub stderr: String,
    /// Exit code; `None` when the process died from a signal.
    pub exit_code: Option<i32>,
    /// How long the command took to execute.
    pub duration: Duration,
}

impl ProcessOutput {
    /// Returns true if the command exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Builds the context a classifier inspects.
    pub fn failure_context(&self) -> FailureContext {
        FailureContext {
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            exit_code: self.exit_code,
            http_status: None,
        }
    }
}

/// One item of a process stream.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// One stdout line, ANSI-stripped, without its line terminator.
    Line(String),
    /// The process exited; always the last item.
    Exited(ProcessOutput),
}

/// Boxed stream of process events.
pub type ProcessStream = Pin<Box<dyn Stream<Item = Result<ProcessEvent, ProcessError>> + Send>>;

// ============================================================================
// Process Runner
// ============================================================================

/// API for running subprocesses (CLI tools).
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

enum Step {
    Cancelled,
    TimedOut,
    Stdout(std::io::Result<usize>),
    Stderr(std::io::Result<usize>),
    Exited(std::io::Result<ExitStatus>),
}

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Runs a command to completion and captures its output.
    ///
    /// A non-zero exit is not an error here; inspect [`ProcessOutput::success`].
    #[instrument(skip(self, spec, options), fields(cmd = %spec.program))]
    pub async fn run(
        &self,
        spec: &CommandSpec,
        options: &RunOptions,
    ) -> Result<ProcessOutput, ProcessError> {
        let mut events = self.stream(spec.clone(), options.clone());
        while let Some(event) = events.next().await {
            if let ProcessEvent::Exited(output) = event? {
                return Ok(output);
            }
        }
        Err(ProcessError::Spawn {
            program: spec.program.clone(),
            reason: "process ended without an exit status".to_string(),
        })
    }

    /// Runs a command, yielding stdout lines as they arrive and then the
    /// exit record.
    ///
    /// The stream ends after the first `Err` or after `Exited`.
    pub fn stream(&self, spec: CommandSpec, options: RunOptions) -> ProcessStream {
        Box::pin(async_stream::stream! {
            debug!(cmd = %spec.program, args = spec.args.len(), stdin = spec.stdin.is_some(), "Running command");
            let start = Instant::now();

            let mut child = match spawn(&spec) {
                Ok(child) => child,
                Err(err) => {
                    warn!(cmd = %spec.program, error = %err, "Failed to start command");
                    yield Err(err);
                    return;
                }
            };
            feed_stdin(&mut child, spec.stdin.as_deref());

            let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
                yield Err(ProcessError::Spawn {
                    program: spec.program.clone(),
                    reason: "stdio pipes unavailable".to_string(),
                });
                return;
            };

            let deadline = deadline(options.timeout);
            tokio::pin!(deadline);

            let mut out_buf = vec![0u8; READ_BUFFER_SIZE];
            let mut err_buf = vec![0u8; READ_BUFFER_SIZE];
            let mut stdout_lines = LineBuffer::default();
            let mut stderr_bytes: Vec<u8> = Vec::new();
            let mut stdout_open = true;
            let mut stderr_open = true;

            let status = loop {
                let step = tokio::select! {
                    biased;
                    () = options.cancel.cancelled() => Step::Cancelled,
                    () = &mut deadline => Step::TimedOut,
                    read = stdout.read(&mut out_buf), if stdout_open => Step::Stdout(read),
                    read = stderr.read(&mut err_buf), if stderr_open => Step::Stderr(read),
                    status = child.wait(), if !stdout_open && !stderr_open => Step::Exited(status),
                };

                match step {
                    Step::Cancelled => {
                        kill(&mut child).await;
                        debug!(cmd = %spec.program, "Command cancelled");
                        yield Err(ProcessError::Cancelled);
                        return;
                    }
                    Step::TimedOut => {
                        kill(&mut child).await;
                        let after = options.timeout.unwrap_or_default();
                        warn!(cmd = %spec.program, timeout = ?after, "Command timed out");
                        yield Err(ProcessError::Timeout(after));
                        return;
                    }
                    Step::Stdout(Ok(0)) => {
                        stdout_open = false;
                        if let Some(line) = stdout_lines.finish() {
                            yield Ok(ProcessEvent::Line(line));
                        }
                    }
                    Step::Stdout(Ok(n)) => {
                        if stdout_lines.len() + stderr_bytes.len() + n > options.max_output_bytes {
                            kill(&mut child).await;
                            warn!(cmd = %spec.program, limit = options.max_output_bytes, "Output limit exceeded");
                            yield Err(ProcessError::OutputLimit { limit: options.max_output_bytes });
                            return;
                        }
                        stdout_lines.extend(&out_buf[..n]);
                        while let Some(line) = stdout_lines.next_line() {
                            yield Ok(ProcessEvent::Line(line));
                        }
                    }
                    Step::Stderr(Ok(0)) => stderr_open = false,
                    Step::Stderr(Ok(n)) => {
                        if stdout_lines.len() + stderr_bytes.len() + n > options.max_output_bytes {
                            kill(&mut child).await;
                            warn!(cmd = %spec.program, limit = options.max_output_bytes, "Output limit exceeded");
                            yield Err(ProcessError::OutputLimit { limit: options.max_output_bytes });
                            return;
                        }
                        stderr_bytes.extend_from_slice(&err_buf[..n]);
                    }
                    Step::Stdout(Err(e)) | Step::Stderr(Err(e)) | Step::Exited(Err(e)) => {
                        kill(&mut child).await;
                        yield Err(ProcessError::Io(e));
                        return;
                    }
                    Step::Exited(Ok(status)) => break status,
                }
            };

            let output = ProcessOutput {
                stdout: strip_ansi_codes(stdout_lines.as_bytes()),
                stderr: strip_ansi_codes(&stderr_bytes),
                exit_code: status.code(),
                duration: start.elapsed(),
            };

            debug!(
                exit_code = ?output.exit_code,
                duration = ?output.duration,
                stdout_len = output.stdout.len(),
                stderr_len = output.stderr.len(),
                "Command completed"
            );

            yield Ok(ProcessEvent::Exited(output));
        })
    }
}

fn spawn(spec: &CommandSpec) -> Result<Child, ProcessError> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .envs(&spec.env)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &spec.working_dir {
        command.current_dir(dir);
    }

    command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProcessError::NotFound(spec.program.clone())
        } else {
            ProcessError::Spawn {
                program: spec.program.clone(),
                reason: e.to_string(),
            }
        }
    })
}

/// Writes the payload on a separate task so a child that produces output
/// before reading its input cannot deadlock us. Dropping the handle closes
/// the pipe.
fn feed_stdin(child: &mut Child, input: Option<&str>) {
    let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) else {
        return;
    };
    let input = input.to_owned();
    tokio::spawn(async move {
        if let Err(e) = stdin.write_all(input.as_bytes()).await {
            debug!(error = %e, "Failed to write stdin");
        }
    });
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Failed to kill child");
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(after) => tokio::time::sleep(after).await,
        None => std::future::pending().await,
    }
}

fn clean_line(bytes: &[u8]) -> String {
    let line = strip_ansi_codes(bytes);
    line.strip_suffix('\r').map(ToString::to_string).unwrap_or(line)
}

// ============================================================================
// Line Splitting
// ============================================================================

/// Accumulates stdout and splits it into lines.
///
/// Every byte is searched for a newline at most once, so a long line that
/// arrives over many reads costs linear time.
#[derive(Debug, Default)]
struct LineBuffer {
    bytes: Vec<u8>,
    /// Start of the partial line not yet emitted.
    line_start: usize,
    /// Everything before this offset is known to hold no newline after `line_start`.
    scanned: usize,
}

impl LineBuffer {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Returns the next complete line, if one has arrived.
    fn next_line(&mut self) -> Option<String> {
        let from = self.scanned.max(self.line_start);
        match self.bytes[from..].iter().position(|b| *b == b'\n') {
            Some(pos) => {
                let end = from + pos;
                let line = clean_line(&self.bytes[self.line_start..end]);
                self.line_start = end + 1;
                self.scanned = self.line_start;
                Some(line)
            }
            None => {
                self.scanned = self.bytes.len();
                None
            }
        }
    }

    /// Returns the trailing unterminated line, once.
    fn finish(&mut self) -> Option<String> {
        if self.line_start >= self.bytes.len() {
            return None;
        }
        let line = clean_line(&self.bytes[self.line_start..]);
        self.line_start = self.bytes.len();
        self.scanned = self.line_start;
        Some(line)
    }
}

// ============================================================================
// ANSI Code Stripping
// ============================================================================

/// Strips ANSI escape sequences and decodes lossily as UTF-8.
pub fn strip_ansi_codes(bytes: &[u8]) -> String {
    let stripped = strip_ansi_escapes::strip(bytes);
    String::from_utf8_lossy(&stripped).into_owned()
}

// ============================================================================
// Tests
// ============================================================================
