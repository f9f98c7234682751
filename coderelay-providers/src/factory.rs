//! Provider resolution.
//!
//! Maps a provider id to a ready-to-run [`Provider`], in this order:
//!
//! 1. a native preset (`claude`, `codex`, `gemini`)
//! 2. a constructor registered at startup
//! 3. a generic [`CliProvider`] built from `config.providers[id]`
//!
//! A provider is only handed out when its binary is reachable. Both the
//! per-id resolution and the per-binary lookup are cached, and concurrent
//! callers asking for the same id or binary share one in-flight attempt.

use coderelay_core::{AppConfig, LaunchConfig, Provider};
use coderelay_exec::{BinaryLookup, PathLookup};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument};

use crate::cli_provider::CliProvider;
use crate::descriptor::ProviderDescriptor;
use crate::registry::native_descriptors;

/// Builds a provider, given the user's launch config for that id if any.
pub type ProviderConstructor =
    Arc<dyn Fn(Option<&LaunchConfig>) -> Arc<dyn Provider> + Send + Sync>;

type Resolution = Arc<OnceCell<Option<Arc<dyn Provider>>>>;

// ============================================================================
// Provider Factory
// ============================================================================

/// Resolves provider ids to providers.
pub struct ProviderFactory {
    config: Arc<AppConfig>,
    lookup: Arc<dyn BinaryLookup>,
    native: HashMap<String, ProviderConstructor>,
    registered: HashMap<String, ProviderConstructor>,
    resolved: Mutex<HashMap<String, Resolution>>,
    binaries: Mutex<HashMap<String, Arc<OnceCell<bool>>>>,
}

impl ProviderFactory {
    /// Creates a factory with the native presets installed.
    pub fn new(config: Arc<AppConfig>, lookup: Arc<dyn BinaryLookup>) -> Self {
        let native = native_descriptors()
            .into_iter()
            .map(|descriptor| (descriptor.id.clone(), preset_constructor(descriptor)))
            .collect();

        Self {
            config,
            lookup,
            native,
            registered: HashMap::new(),
            resolved: Mutex::new(HashMap::new()),
            binaries: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a factory that looks binaries up on `PATH`.
    pub fn with_path_lookup(config: Arc<AppConfig>) -> Self {
        Self::new(config, Arc::new(PathLookup::new()))
    }

    /// Registers a user-defined provider constructor.
    ///
    /// A native preset with the same id still takes precedence.
    pub fn register<F>(&mut self, id: impl Into<String>, constructor: F)
    where
        F: Fn(Option<&LaunchConfig>) -> Arc<dyn Provider> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.native.contains_key(&id) {
            debug!(provider = %id, "Registered provider is shadowed by a native preset");
        }
        self.registered.insert(id, Arc::new(constructor));
    }

    /// Returns the configuration the factory was built with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns true if `id` is a native preset.
    pub fn is_native(&self, id: &str) -> bool {
        self.native.contains_key(id)
    }

    /// Resolves a provider.
    ///
    /// Returns `None` for unknown ids and for providers whose binary is not
    /// reachable. The answer is cached until [`ProviderFactory::clear_cache`].
    #[instrument(skip(self))]
    pub async fn get_provider(&self, id: &str) -> Option<Arc<dyn Provider>> {
        let cell = {
            let mut resolved = self.resolved.lock().await;
            Arc::clone(resolved.entry(id.to_string()).or_default())
        };
        cell.get_or_init(|| self.resolve(id)).await.clone()
    }

    /// Drops cached resolutions and binary lookups.
    pub async fn clear_cache(&self) {
        self.resolved.lock().await.clear();
        self.binaries.lock().await.clear();
        debug!("Provider cache cleared");
    }

    /// Returns every id the factory can attempt: native, registered and
    /// configured, sorted.
    pub fn known_ids(&self) -> Vec<String> {
        self.native
            .keys()
            .chain(self.registered.keys())
            .chain(self.config.providers.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    async fn resolve(&self, id: &str) -> Option<Arc<dyn Provider>> {
        let launch = self.config.launch_config(id);

        let provider = if let Some(constructor) = self.native.get(id) {
            constructor(launch)
        } else if let Some(constructor) = self.registered.get(id) {
            constructor(launch)
        } else if let Some(launch) = launch {
            Arc::new(CliProvider::new(id, launch.clone()))
        } else {
            debug!(provider = %id, "Unknown provider id");
            return None;
        };

        if self.binary_available(provider.binary()).await {
            debug!(provider = %id, binary = %provider.binary(), "Provider resolved");
            Some(provider)
        } else {
            info!(provider = %id, binary = %provider.binary(), "Provider binary not found");
            None
        }
    }

    async fn binary_available(&self, binary: &str) -> bool {
        let cell = {
            let mut binaries = self.binaries.lock().await;
            Arc::clone(binaries.entry(binary.to_string()).or_default())
        };
        *cell
            .get_or_init(|| async { self.lookup.find(binary).await.is_some() })
            .await
    }
}

impl fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderFactory")
            .field("native", &self.native.keys().collect::<BTreeSet<_>>())
            .field("registered", &self.registered.keys().collect::<BTreeSet<_>>())
            .field("configured", &self.config.providers.keys().collect::<BTreeSet<_>>())
            .finish_non_exhaustive()
    }
}

fn preset_constructor(descriptor: ProviderDescriptor) -> ProviderConstructor {
    Arc::new(move |launch: Option<&LaunchConfig>| -> Arc<dyn Provider> {
        Arc::new(CliProvider::from_descriptor(
            descriptor.clone().with_launch_override(launch),
        ))
    })
}
