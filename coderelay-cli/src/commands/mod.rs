//! CLI command implementations.

pub mod providers;
pub mod reset;
pub mod route;
pub mod status;
