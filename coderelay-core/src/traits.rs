//! Trait definitions for CodeRelay.
//!
//! This module defines the contract every provider adapter satisfies and the
//! per-invocation options threaded through it.

use async_trait::async_trait;
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::classify::ErrorClassifier;
use crate::error::{FailureContext, ProviderError};
use crate::models::{
    Capability, CodingRequest, ErrorKind, ProviderEvent, ProviderInfo, ProviderResponse,
};

/// Default ceiling on captured subprocess output (100 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 100 * 1024 * 1024;

static DEFAULT_CLASSIFIER: LazyLock<ErrorClassifier> = LazyLock::new(ErrorClassifier::with_defaults);

/// Boxed stream of provider events.
pub type ProviderEventStream = Pin<Box<dyn Stream<Item = ProviderEvent> + Send>>;

// ============================================================================
// Invoke Options
// ============================================================================

/// Per-invocation options.
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    /// Cancels the invocation and kills the subprocess.
    pub cancel: CancellationToken,
    /// Overrides the provider's own timeout.
    pub timeout: Option<Duration>,
    /// Ceiling on accumulated output.
    pub max_output_bytes: usize,
    /// Working directory for the subprocess.
    pub working_dir: Option<PathBuf>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            timeout: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            working_dir: None,
        }
    }
}

impl InvokeOptions {
    /// Options bound to an existing cancellation token.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Default::default()
        }
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the output ceiling.
    pub fn max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }

    /// Sets the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Returns true once the caller has cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// A backend that executes one coding request via an external tool.
///
/// Implementors are responsible for:
/// - Translating the request into the tool's command line
/// - Capping output, honoring cancellation and timeouts
/// - Normalizing the result or reporting a classifiable failure
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Provider id (`claude`, `codex`, ...).
    fn id(&self) -> &str;

    /// Human-readable name.
    fn display_name(&self) -> &str {
        self.id()
    }

    /// Binary that must be reachable for this provider to run.
    fn binary(&self) -> &str;

    /// Whether `run_stream` emits incremental deltas.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Whether the tool is asked for JSON output.
    fn prefers_json(&self) -> bool {
        false
    }

    /// Advertised capabilities.
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Generate]
    }

    /// Runs the request to completion.
    async fn run_once(
        &self,
        request: &CodingRequest,
        options: &InvokeOptions,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Runs the request, yielding events as they arrive.
    ///
    /// The stream is exactly one `Start`, zero or more `TextDelta`/`Chunk`,
    /// then one terminal `Complete` or `Error`. The default adapts
    /// [`Provider::run_once`] for tools without incremental output.
    fn run_stream(self: Arc<Self>, request: CodingRequest, options: InvokeOptions) -> ProviderEventStream {
        Box::pin(async_stream::stream! {
            yield ProviderEvent::Start { provider: self.id().to_string() };
            match self.run_once(&request, &options).await {
                Ok(response) => {
                    if !response.text.is_empty() {
                        yield ProviderEvent::TextDelta(response.text.clone());
                    }
                    yield ProviderEvent::Complete(response);
                }
                Err(error) => yield ProviderEvent::Error(error),
            }
        })
    }

    /// Classifies a failure of this provider.
    fn classify_error(&self, failure: &FailureContext) -> ErrorKind {
        DEFAULT_CLASSIFIER.classify(failure)
    }

    /// Static description.
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id().to_string(),
            display_name: self.display_name().to_string(),
            binary: self.binary().to_string(),
            supports_streaming: self.supports_streaming(),
            prefers_json: self.prefers_json(),
            capabilities: self.capabilities(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct Echo;

    #[async_trait]
    impl Provider for Echo {
        fn id(&self) -> &str {
            "echo"
        }

        fn binary(&self) -> &str {
            "echo"
        }

        async fn run_once(
            &self,
            request: &CodingRequest,
            _options: &InvokeOptions,
        ) -> Result<ProviderResponse, ProviderError> {
            if request.prompt.is_empty() {
                return Err(ProviderError::Failed(FailureContext::from_message("bad request")));
            }
            Ok(ProviderResponse::new("echo", request.prompt.clone()))
        }
    }

    #[tokio::test]
    async fn test_default_stream_shape_success() {
        let provider: Arc<dyn Provider> = Arc::new(Echo);
        let events: Vec<_> = provider
            .run_stream(CodingRequest::new("hi"), InvokeOptions::default())
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ProviderEvent::Start { .. }));
        assert!(matches!(&events[1], ProviderEvent::TextDelta(t) if t == "hi"));
        assert!(matches!(&events[2], ProviderEvent::Complete(r) if r.text == "hi"));
    }

    #[tokio::test]
    async fn test_default_stream_shape_error() {
        let provider: Arc<dyn Provider> = Arc::new(Echo);
        let events: Vec<_> = provider
            .run_stream(CodingRequest::new(""), InvokeOptions::default())
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
        assert!(matches!(events[1], ProviderEvent::Error(_)));
    }

    #[test]
    fn test_default_info_and_classifier() {
        let provider = Echo;
        let info = provider.info();
        assert_eq!(info.id, "echo");
        assert_eq!(info.capabilities, vec![Capability::Generate]);
        assert_eq!(
            provider.classify_error(&FailureContext::from_message("Bad Request")),
            ErrorKind::BadRequest
        );
    }

    #[test]
    fn test_invoke_options_defaults() {
        let options = InvokeOptions::default();
        assert_eq!(options.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
        assert!(options.timeout.is_none());
        assert!(!options.is_cancelled());
    }
}
