//! Priority routing with failover.
//!
//! The router walks an ordered candidate list, skipping providers that are
//! missing or in cooldown, and stops at the first success. Failures are
//! classified and decide what happens next:
//!
//! - request-fatal kinds end the walk with [`RouteError::Rejected`],
//! - credit and rate-limit kinds put the provider into a one hour cooldown
//!   and move on,
//! - everything else moves on without a cooldown.
//!
//! Cancellation ends the walk immediately and is never recorded against a
//! provider.

use chrono::TimeDelta;
use coderelay_core::{
    AppConfig, Clock, CodingRequest, ErrorKind, InvokeOptions, Provider, ProviderError,
    ProviderEvent, ProviderResponse,
};
use coderelay_providers::ProviderFactory;
use coderelay_store::StateManager;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::attempt::{Attempt, RouteResponse};
use crate::error::RouteError;

/// Hours a provider sits out after a credit or rate-limit failure.
pub const COOLDOWN_HOURS: i64 = 1;

/// Boxed stream of routing events.
pub type RouteEventStream = Pin<Box<dyn Stream<Item = RouteEvent> + Send>>;

// ============================================================================
// Route Events
// ============================================================================

/// One event of a streaming routing walk.
///
/// Exactly one terminal `Complete` or `Failed` ends the stream.
#[derive(Debug)]
pub enum RouteEvent {
    /// A candidate is being invoked.
    Attempt {
        /// Provider id.
        provider: String,
    },
    /// Incremental text from the current candidate.
    Delta {
        /// Provider id.
        provider: String,
        /// Text fragment.
        text: String,
    },
    /// A structured chunk from the current candidate.
    Chunk {
        /// Provider id.
        provider: String,
        /// Raw chunk.
        value: serde_json::Value,
    },
    /// The current candidate failed and the walk continues.
    ///
    /// Text already received from this provider should be discarded.
    Failover {
        /// Provider id.
        provider: String,
        /// Failure classification.
        kind: ErrorKind,
        /// Failure message.
        message: String,
    },
    /// Terminal success.
    Complete(RouteResponse),
    /// Terminal failure.
    Failed(RouteError),
}

impl RouteEvent {
    /// Returns true for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failed(_))
    }
}

// ============================================================================
// Walk Steps
// ============================================================================

/// Result of the pre-invocation checks for one candidate.
enum Admission {
    Ready(Arc<dyn Provider>),
    Skipped(Attempt),
}

/// What to do after a candidate failed.
enum Verdict {
    Stop(RouteError),
    Next(Attempt),
}

// ============================================================================
// Router
// ============================================================================

/// Routes coding requests across providers.
///
/// Cheap to clone; clones share the factory, state and clock.
#[derive(Clone)]
pub struct Router {
    factory: Arc<ProviderFactory>,
    state: Arc<StateManager>,
    clock: Arc<dyn Clock>,
}

impl Router {
    /// Creates a router.
    pub fn new(factory: Arc<ProviderFactory>, state: Arc<StateManager>, clock: Arc<dyn Clock>) -> Self {
        Self {
            factory,
            state,
            clock,
        }
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &AppConfig {
        self.factory.config()
    }

    /// Returns the provider factory.
    pub fn factory(&self) -> &ProviderFactory {
        &self.factory
    }

    /// Returns the state manager.
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Builds the ordered candidate list for a request.
    ///
    /// An explicit provider wins, then the mode's override list, then the
    /// default order.
    pub fn candidates(&self, request: &CodingRequest) -> Result<Vec<String>, RouteError> {
        if let Some(provider) = &request.provider {
            return Ok(vec![provider.clone()]);
        }

        let order = self.config().routing.order_for(&request.mode);
        if order.is_empty() {
            return Err(RouteError::Config(format!(
                "no providers configured for mode '{}'",
                request.mode
            )));
        }
        Ok(order.to_vec())
    }

    /// Routes a request to the first provider that answers.
    #[instrument(skip(self, request, options), fields(mode = %request.mode))]
    pub async fn route(
        &self,
        request: &CodingRequest,
        options: &InvokeOptions,
    ) -> Result<RouteResponse, RouteError> {
        let start = Instant::now();
        let candidates = self.candidates(request)?;
        let mut attempts = Vec::with_capacity(candidates.len());

        info!(candidates = ?candidates, "Routing request");

        for id in &candidates {
            if options.is_cancelled() {
                debug!("Cancelled before next candidate");
                return Err(RouteError::Aborted);
            }

            let provider = match self.admit(id).await {
                Admission::Ready(provider) => provider,
                Admission::Skipped(attempt) => {
                    attempts.push(attempt);
                    continue;
                }
            };

            let attempt_start = Instant::now();
            debug!(provider = %id, "Invoking provider");

            match provider.run_once(request, options).await {
                Ok(response) => {
                    let attempt = self.settle_success(id, &response, attempt_start.elapsed()).await;
                    attempts.push(attempt);
                    return Ok(finish(id, response, attempts, start.elapsed()));
                }
                Err(error) => {
                    match self
                        .settle_failure(id, &*provider, &error, attempt_start.elapsed())
                        .await
                    {
                        Verdict::Stop(error) => return Err(error),
                        Verdict::Next(attempt) => attempts.push(attempt),
                    }
                }
            }
        }

        warn!(attempts = attempts.len(), "All providers failed");
        Err(RouteError::Exhausted { attempts })
    }

    /// Routes a request, streaming the winning provider's output.
    ///
    /// Applies the same candidate and failure policy as [`Router::route`].
    /// Output from a candidate that later fails is followed by a
    /// [`RouteEvent::Failover`].
    pub fn route_stream(&self, request: CodingRequest, options: InvokeOptions) -> RouteEventStream {
        let router = self.clone();

        Box::pin(async_stream::stream! {
            let start = Instant::now();
            let candidates = match router.candidates(&request) {
                Ok(candidates) => candidates,
                Err(error) => {
                    yield RouteEvent::Failed(error);
                    return;
                }
            };
            let mut attempts = Vec::with_capacity(candidates.len());

            info!(mode = %request.mode, candidates = ?candidates, "Routing streaming request");

            for id in candidates {
                if options.is_cancelled() {
                    yield RouteEvent::Failed(RouteError::Aborted);
                    return;
                }

                let provider = match router.admit(&id).await {
                    Admission::Ready(provider) => provider,
                    Admission::Skipped(attempt) => {
                        attempts.push(attempt);
                        continue;
                    }
                };

                yield RouteEvent::Attempt { provider: id.clone() };
                let attempt_start = Instant::now();
                let mut events = Arc::clone(&provider).run_stream(request.clone(), options.clone());
                let mut outcome = None;

                while let Some(event) = events.next().await {
                    match event {
                        ProviderEvent::Start { .. } => {}
                        ProviderEvent::TextDelta(text) => {
                            yield RouteEvent::Delta { provider: id.clone(), text };
                        }
                        ProviderEvent::Chunk(value) => {
                            yield RouteEvent::Chunk { provider: id.clone(), value };
                        }
                        ProviderEvent::Complete(response) => {
                            outcome = Some(Ok(response));
                            break;
                        }
                        ProviderEvent::Error(error) => {
                            outcome = Some(Err(error));
                            break;
                        }
                    }
                }
                drop(events);

                let outcome = outcome.unwrap_or_else(|| {
                    Err(ProviderError::InvalidOutput(
                        "provider stream ended without a result".to_string(),
                    ))
                });

                match outcome {
                    Ok(response) => {
                        let attempt = router.settle_success(&id, &response, attempt_start.elapsed()).await;
                        attempts.push(attempt);
                        yield RouteEvent::Complete(finish(&id, response, attempts, start.elapsed()));
                        return;
                    }
                    Err(error) => {
                        match router.settle_failure(&id, &*provider, &error, attempt_start.elapsed()).await {
                            Verdict::Stop(error) => {
                                yield RouteEvent::Failed(error);
                                return;
                            }
                            Verdict::Next(attempt) => {
                                yield RouteEvent::Failover {
                                    provider: id.clone(),
                                    kind: attempt.kind.unwrap_or(ErrorKind::Unknown),
                                    message: attempt.error.clone().unwrap_or_default(),
                                };
                                attempts.push(attempt);
                            }
                        }
                    }
                }
            }

            warn!(attempts = attempts.len(), "All providers failed");
            yield RouteEvent::Failed(RouteError::Exhausted { attempts });
        })
    }

    // ========================================================================
    // Policy
    // ========================================================================

    /// Resolves a candidate and checks its cooldown and daily budget.
    async fn admit(&self, id: &str) -> Admission {
        let Some(provider) = self.factory.get_provider(id).await else {
            debug!(provider = %id, "Provider unavailable, skipping");
            return Admission::Skipped(Attempt::skipped(id, ErrorKind::NotFound, "provider unavailable"));
        };

        let now = self.clock.now();
        let state = self.state.get_provider_state(id).await;

        if let Some(until) = state.out_of_credits_until.filter(|until| *until > now) {
            debug!(provider = %id, until = %until, "Provider in cooldown, skipping");
            return Admission::Skipped(Attempt::skipped(
                id,
                ErrorKind::OutOfCredits,
                format!("cooling down until {}", until.to_rfc3339()),
            ));
        }

        if let Some(policy) = self.config().credit_policy(id) {
            if let Some(limit) = policy.daily_limit() {
                if state.requests_today >= limit {
                    let until = policy.next_reset(now);
                    self.state.mark_out_of_credits(id, until).await;
                    debug!(provider = %id, limit, until = %until, "Daily limit reached, skipping");
                    return Admission::Skipped(Attempt::skipped(
                        id,
                        ErrorKind::OutOfCredits,
                        format!("daily limit of {limit} requests reached"),
                    ));
                }
            }
        }

        Admission::Ready(provider)
    }

    async fn settle_success(&self, id: &str, response: &ProviderResponse, duration: Duration) -> Attempt {
        self.state.record_success(id, response.tokens_saved()).await;
        info!(provider = %id, duration = ?duration, tokens = response.tokens_saved(), "Provider succeeded");
        Attempt::success(id, duration)
    }

    async fn settle_failure(
        &self,
        id: &str,
        provider: &dyn Provider,
        error: &ProviderError,
        duration: Duration,
    ) -> Verdict {
        if error.is_aborted() {
            debug!(provider = %id, "Provider invocation aborted");
            return Verdict::Stop(RouteError::Aborted);
        }

        let kind = if error.is_timeout() {
            ErrorKind::Timeout
        } else {
            provider.classify_error(&error.failure_context())
        };
        let message = error.message();

        self.state.record_error(id, kind, &message).await;
        warn!(provider = %id, kind = %kind, error = %message, duration = ?duration, "Provider failed");

        if kind.is_request_fatal() {
            return Verdict::Stop(RouteError::Rejected {
                provider: id.to_string(),
                kind,
                message,
            });
        }

        if kind.triggers_cooldown() {
            let until = self.clock.now() + TimeDelta::hours(COOLDOWN_HOURS);
            self.state.mark_out_of_credits(id, until).await;
        }

        Verdict::Next(Attempt::failure(id, kind, message, duration))
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("factory", &self.factory)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn finish(id: &str, response: ProviderResponse, attempts: Vec<Attempt>, duration: Duration) -> RouteResponse {
    RouteResponse {
        provider: id.to_string(),
        text: response.text,
        usage: response.usage,
        attempts,
        duration,
    }
}
