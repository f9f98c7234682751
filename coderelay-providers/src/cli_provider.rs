//! Generic command-line provider.
//!
//! Drives any CLI tool described by a [`LaunchConfig`]: builds the command
//! line from the request, runs it through the [`ProcessRunner`], and turns
//! the output into a [`ProviderResponse`] or a classifiable failure.

use async_trait::async_trait;
use coderelay_core::{
    Capability, CodingRequest, ErrorClassifier, ErrorKind, FailureContext, InvokeOptions,
    LaunchConfig, OutputFormat, PromptStyle, Provider, ProviderError, ProviderEvent,
    ProviderEventStream, ProviderResponse, Usage,
};
use coderelay_exec::{CommandSpec, ProcessEvent, ProcessOutput, ProcessRunner, RunOptions};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::descriptor::{ProviderDescriptor, UsageParser};

// ============================================================================
// CLI Provider
// ============================================================================

/// A provider backed by a local CLI tool.
#[derive(Debug)]
pub struct CliProvider {
    id: String,
    display_name: String,
    launch: LaunchConfig,
    classifier: ErrorClassifier,
    capabilities: Vec<Capability>,
    usage_parser: Option<UsageParser>,
    runner: ProcessRunner,
}

impl CliProvider {
    /// Creates a provider from a bare launch config.
    pub fn new(id: impl Into<String>, launch: LaunchConfig) -> Self {
        Self::from_descriptor(ProviderDescriptor::from_launch(id, launch))
    }

    /// Creates a provider from a descriptor.
    ///
    /// Classification order: the launch config's patterns, then the
    /// descriptor's, then the generic defaults unless the launch config
    /// opts out of them.
    pub fn from_descriptor(descriptor: ProviderDescriptor) -> Self {
        let mut patterns = descriptor.launch.error_patterns.clone();
        patterns.extend(descriptor.error_patterns);
        let classifier = if descriptor.launch.default_patterns {
            ErrorClassifier::new(patterns)
        } else {
            ErrorClassifier::only(patterns)
        };

        let mut capabilities = descriptor.capabilities;
        if descriptor.launch.streaming && !capabilities.contains(&Capability::Streaming) {
            capabilities.push(Capability::Streaming);
        }
        if descriptor.launch.output.is_json() && !capabilities.contains(&Capability::Json) {
            capabilities.push(Capability::Json);
        }

        Self {
            id: descriptor.id,
            display_name: descriptor.display_name,
            launch: descriptor.launch,
            classifier,
            capabilities,
            usage_parser: descriptor.usage_parser,
            runner: ProcessRunner::new(),
        }
    }

    /// Returns the launch config in use.
    pub fn launch(&self) -> &LaunchConfig {
        &self.launch
    }

    fn default_timeout(&self) -> Option<Duration> {
        self.launch.timeout_secs.map(Duration::from_secs)
    }

    /// Builds the command line for a request.
    pub fn build_command(&self, request: &CodingRequest, options: &InvokeOptions) -> CommandSpec {
        let launch = &self.launch;
        let mut spec = CommandSpec::new(&launch.command).args(launch.args.iter().cloned());
        spec.env.clone_from(&launch.env);
        spec.working_dir.clone_from(&options.working_dir);

        if let (Some(flag), Some(model)) = (&launch.model_flag, &request.params.model) {
            spec = spec.arg(flag).arg(model);
        }

        let mut prompt = request.prompt.clone();
        match &launch.file_flag {
            Some(flag) => {
                for file in &request.files {
                    spec = spec.arg(flag).arg(file.display().to_string());
                }
            }
            None if !request.files.is_empty() => {
                prompt.push_str("\n\nFiles:");
                for file in &request.files {
                    let _ = write!(prompt, "\n- {}", file.display());
                }
            }
            None => {}
        }

        match &launch.prompt {
            PromptStyle::Arg => spec.arg(prompt),
            PromptStyle::Flag { flag } => spec.arg(flag).arg(prompt),
            PromptStyle::Stdin => spec.stdin(prompt),
        }
    }

    /// Interprets the output of a process that exited.
    fn finish(&self, output: &ProcessOutput) -> Result<ProviderResponse, ProviderError> {
        if !output.success() {
            return Err(ProviderError::Failed(output.failure_context()));
        }

        let (text, usage) = match &self.launch.output {
            OutputFormat::Text => (output.stdout.trim().to_string(), None),
            OutputFormat::Json {
                text_pointer,
                usage_pointer,
            } => {
                let doc = json_document(&output.stdout, text_pointer).ok_or_else(|| {
                    ProviderError::InvalidOutput(format!("no JSON value at {text_pointer}"))
                })?;
                let text = match doc.pointer(text_pointer) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                let usage = usage_pointer
                    .as_deref()
                    .and_then(|pointer| doc.pointer(pointer))
                    .and_then(usage_from_value);
                (text, usage)
            }
        };

        let usage = usage.or_else(|| self.usage_parser.and_then(|parse| parse(output)));
        let response = ProviderResponse::new(&self.id, text);
        Ok(match usage {
            Some(usage) => response.with_usage(usage),
            None => response,
        })
    }
}

#[async_trait]
impl Provider for CliProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn binary(&self) -> &str {
        &self.launch.command
    }

    fn supports_streaming(&self) -> bool {
        self.launch.streaming
    }

    fn prefers_json(&self) -> bool {
        self.launch.output.is_json()
    }

    fn capabilities(&self) -> Vec<Capability> {
        self.capabilities.clone()
    }

    #[instrument(skip(self, request, options), fields(provider = %self.id))]
    async fn run_once(
        &self,
        request: &CodingRequest,
        options: &InvokeOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        let spec = self.build_command(request, options);
        let run_options = RunOptions::from_invoke(options, self.default_timeout());
        let output = self.runner.run(&spec, &run_options).await?;
        debug!(exit_code = ?output.exit_code, duration = ?output.duration, "Provider process exited");
        self.finish(&output)
    }

    fn run_stream(self: Arc<Self>, request: CodingRequest, options: InvokeOptions) -> ProviderEventStream {
        Box::pin(async_stream::stream! {
            yield ProviderEvent::Start { provider: self.id.clone() };

            let spec = self.build_command(&request, &options);
            let run_options = RunOptions::from_invoke(&options, self.default_timeout());
            let mut events = self.runner.stream(spec, run_options);
            let mut forwarded = false;

            while let Some(event) = events.next().await {
                match event {
                    Ok(ProcessEvent::Line(line)) => {
                        if !self.launch.streaming {
                            continue;
                        }
                        if self.launch.output.is_json() {
                            if let Ok(value) = serde_json::from_str::<Value>(&line) {
                                yield ProviderEvent::Chunk(value);
                            }
                        } else {
                            forwarded = true;
                            yield ProviderEvent::TextDelta(format!("{line}\n"));
                        }
                    }
                    Ok(ProcessEvent::Exited(output)) => {
                        match self.finish(&output) {
                            Ok(response) => {
                                if !forwarded && !response.text.is_empty() {
                                    yield ProviderEvent::TextDelta(response.text.clone());
                                }
                                yield ProviderEvent::Complete(response);
                            }
                            Err(error) => yield ProviderEvent::Error(error),
                        }
                        return;
                    }
                    Err(error) => {
                        yield ProviderEvent::Error(error.into());
                        return;
                    }
                }
            }

            yield ProviderEvent::Error(ProviderError::InvalidOutput(
                "process output ended without an exit status".to_string(),
            ));
        })
    }

    fn classify_error(&self, failure: &FailureContext) -> ErrorKind {
        self.classifier.classify(failure)
    }
}

// ============================================================================
// Output Parsing
// ============================================================================

/// Finds the JSON document carrying `pointer`.
///
/// Accepts a single document, or JSON lines where the last line resolving
/// the pointer wins.
fn json_document(stdout: &str, pointer: &str) -> Option<Value> {
    if let Ok(doc) = serde_json::from_str::<Value>(stdout.trim()) {
        if doc.pointer(pointer).is_some() {
            return Some(doc);
        }
    }

    stdout
        .lines()
        .rev()
        .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .find(|doc| doc.pointer(pointer).is_some())
}

#[derive(Deserialize)]
struct UsageDoc {
    #[serde(alias = "prompt_tokens", alias = "inputTokens", default)]
    input_tokens: u64,
    #[serde(alias = "completion_tokens", alias = "outputTokens", default)]
    output_tokens: u64,
    #[serde(
        alias = "cache_read_input_tokens",
        alias = "cachedTokens",
        default
    )]
    cached_tokens: u64,
}

/// Reads a usage object with the common token field spellings.
pub fn usage_from_value(value: &Value) -> Option<Usage> {
    let doc = UsageDoc::deserialize(value).ok()?;
    let usage = Usage {
        input_tokens: doc.input_tokens,
        output_tokens: doc.output_tokens,
        cached_tokens: doc.cached_tokens,
    };
    (usage.total() > 0 || usage.cached_tokens > 0).then_some(usage)
}
