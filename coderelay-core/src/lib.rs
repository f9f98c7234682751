// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `CodeRelay` Core
//!
//! Core types, error taxonomy, and the provider contract shared by every
//! other `CodeRelay` crate:
//!
//! - Request/response models and the provider event stream
//! - The error-kind taxonomy and the failure classifier
//! - Configuration document types
//! - The [`Provider`] trait and per-invocation options
//! - A [`Clock`] abstraction for time-dependent state
//!
//! ## Key Types
//!
//! ### Requests
//! - [`CodingRequest`] - Prompt, mode, optional provider pin, context files
//! - [`ProviderResponse`] - Normalized result of a successful invocation
//! - [`ProviderEvent`] - One item of a streamed invocation
//!
//! ### Failures
//! - [`ErrorKind`] - Closed taxonomy driving failover decisions
//! - [`ErrorClassifier`] - Ordered substring table plus status/exit rules
//! - [`ProviderError`] - What an invocation returns on failure
//!
//! ### Configuration
//! - [`AppConfig`] - Routing order, launch configs, credit policies

pub mod classify;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::{CoreError, EXIT_COMMAND_NOT_FOUND, FailureContext, ProviderError};

// Re-export all model types
pub use models::{
    // Provider description
    Capability,
    ProviderInfo,
    // Requests
    CodingRequest,
    DEFAULT_MODE,
    GenerationParams,
    // Responses
    ProviderEvent,
    ProviderResponse,
    Usage,
    // Failures
    ErrorKind,
};

pub use classify::{ErrorClassifier, ErrorPattern, classify_http_status};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AppConfig, CreditPolicy, CreditsConfig, LaunchConfig, OutputFormat, PromptStyle,
    RoutingConfig,
};

// Re-export traits
pub use traits::{DEFAULT_MAX_OUTPUT_BYTES, InvokeOptions, Provider, ProviderEventStream};
