//! Wiring: config, state, provider factory and router.

use anyhow::{Context, Result};
use coderelay_core::{AppConfig, Clock, SystemClock};
use coderelay_providers::ProviderFactory;
use coderelay_router::Router;
use coderelay_store::{StateManager, default_config_path, default_state_path};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::Cli;

/// Everything a command needs, built once per invocation.
pub struct App {
    pub router: Router,
    pub factory: Arc<ProviderFactory>,
    pub state: Arc<StateManager>,
    pub clock: Arc<dyn Clock>,
}

impl App {
    /// Loads config and state from the paths given on the command line, or
    /// the per-user defaults.
    pub async fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli.config.clone().unwrap_or_else(default_config_path);
        let state_path = cli.state.clone().unwrap_or_else(default_state_path);
        debug!(config = %config_path.display(), state = %state_path.display(), "Loading");

        let config = load_config(config_path)?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let factory = Arc::new(ProviderFactory::with_path_lookup(Arc::new(config)));
        let state = Arc::new(StateManager::open(&state_path, clock.clone()).await);
        let router = Router::new(factory.clone(), state.clone(), clock.clone());

        Ok(Self {
            router,
            factory,
            state,
            clock,
        })
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &AppConfig {
        self.factory.config()
    }
}

fn load_config(path: PathBuf) -> Result<AppConfig> {
    AppConfig::load_from(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
