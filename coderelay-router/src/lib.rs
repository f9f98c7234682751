// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # CodeRelay Router
//!
//! Sends a coding request to the first provider in priority order that can
//! take it, failing over on errors that another provider might not hit.
//!
//! ## Example
//!
//! ```ignore
//! use coderelay_core::{CodingRequest, InvokeOptions, SystemClock};
//! use coderelay_router::Router;
//!
//! let router = Router::new(factory, state, Arc::new(SystemClock));
//! let response = router
//!     .route(&CodingRequest::new("add tests").with_mode("review"), &InvokeOptions::default())
//!     .await?;
//! println!("{} answered: {}", response.provider, response.text);
//! ```

pub mod attempt;
pub mod error;
pub mod router;

pub use attempt::{Attempt, RouteResponse};
pub use error::RouteError;
pub use router::{COOLDOWN_HOURS, RouteEvent, RouteEventStream, Router};
