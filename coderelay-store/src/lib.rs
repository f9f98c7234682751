// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # CodeRelay Store
//!
//! Persistent per-provider usage state.
//!
//! This crate provides:
//!
//! - **StateManager**: request counters, error history and cooldowns, with
//!   lazy daily reset and debounced saving
//! - **Persistence**: atomic JSON file I/O and default paths
//!
//! ## Usage
//!
//! ```ignore
//! use coderelay_core::SystemClock;
//! use coderelay_store::{default_state_path, StateManager};
//! use std::sync::Arc;
//!
//! let state = Arc::new(StateManager::open(default_state_path(), Arc::new(SystemClock)).await);
//! state.record_success("claude", 1200).await;
//!
//! // Write on a cadence, and once more when `cancel` fires
//! let autosave = state.clone().spawn_autosave(Duration::from_secs(5), cancel.clone());
//! ```

pub mod error;
pub mod manager;
pub mod persistence;
pub mod state;

pub use error::StoreError;
pub use manager::StateManager;
pub use persistence::{
    default_config_dir, default_config_path, default_data_dir, default_state_path, load_json,
    save_json,
};
pub use state::{CURRENT_VERSION, ErrorRecord, FullState, MAX_LAST_ERRORS, ProviderState};
