//! Domain models for CodeRelay.
//!
//! ## Submodules
//!
//! - [`error_kind`] - The closed failure taxonomy (`ErrorKind`)
//! - [`request`] - Coding requests and generation parameters
//! - [`response`] - Provider responses, usage, and stream events
//! - [`provider`] - Provider info and capabilities

mod error_kind;
mod provider;
mod request;
mod response;

// Re-export everything at the models level
pub use error_kind::ErrorKind;
pub use provider::{Capability, ProviderInfo};
pub use request::{CodingRequest, DEFAULT_MODE, GenerationParams};
pub use response::{ProviderEvent, ProviderResponse, Usage};
