//! Owner of the persisted provider state.
//!
//! Mutations happen in memory and mark the document dirty. Writing it out is
//! the owner's job: call [`StateManager::flush`] on a cadence and at
//! shutdown, or let [`StateManager::spawn_autosave`] do it. Mutations between
//! two flushes coalesce into one write.
//!
//! Only one `StateManager` may own a given file at a time.

use chrono::{DateTime, Utc};
use coderelay_core::{Clock, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::persistence::{load_json, save_json};
use crate::state::{CURRENT_VERSION, ErrorRecord, FullState, ProviderState};

// ============================================================================
// State Manager
// ============================================================================

/// Thread-safe, lazily persisted provider state.
pub struct StateManager {
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    state: RwLock<FullState>,
    dirty: AtomicBool,
    flush_lock: Mutex<()>,
}

impl StateManager {
    /// Opens the state stored at `path`.
    ///
    /// A missing file starts empty. An unreadable, corrupt or newer document
    /// is logged and also starts empty; the next flush overwrites it.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match load_state(&path).await {
            Ok(state) => {
                debug!(providers = state.providers.len(), "State loaded");
                state
            }
            Err(e) if e.is_not_found() => {
                debug!("No state file yet, starting empty");
                FullState::default()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load state, starting empty");
                FullState::default()
            }
        };
        Self::with_state(Some(path), clock, state)
    }

    /// Creates a manager that never touches the filesystem.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::with_state(None, clock, FullState::default())
    }

    fn with_state(path: Option<PathBuf>, clock: Arc<dyn Clock>, state: FullState) -> Self {
        Self {
            path,
            clock,
            state: RwLock::new(state),
            dirty: AtomicBool::new(false),
            flush_lock: Mutex::new(()),
        }
    }

    /// Returns the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns true if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Runs `f` on the provider's entry, creating and rolling it over first.
    async fn update<R>(&self, id: &str, f: impl FnOnce(&mut ProviderState) -> R) -> R {
        let today = self.clock.today();
        let mut state = self.state.write().await;
        let entry = state
            .providers
            .entry(id.to_string())
            .or_insert_with(|| ProviderState::new(today));
        entry.roll_over(today);
        f(entry)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns a copy of one provider's state, creating a zeroed entry for
    /// an unknown id.
    ///
    /// The daily counters are reset here the first time the provider is
    /// looked at on a new local day. Creating or rolling over an entry
    /// marks the document dirty.
    pub async fn get_provider_state(&self, id: &str) -> ProviderState {
        let today = self.clock.today();

        {
            let state = self.state.read().await;
            if let Some(entry) = state.providers.get(id) {
                if entry.last_reset >= today {
                    return entry.clone();
                }
            }
        }

        let mut state = self.state.write().await;
        let mut changed = false;
        let entry = state.providers.entry(id.to_string()).or_insert_with(|| {
            changed = true;
            ProviderState::new(today)
        });
        if entry.roll_over(today) {
            debug!(provider = %id, day = %today, "Daily counters reset");
            changed = true;
        }
        if changed {
            self.mark_dirty();
        }
        entry.clone()
    }

    /// Returns a copy of the whole document.
    pub async fn snapshot(&self) -> FullState {
        self.state.read().await.clone()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Records a successful request.
    pub async fn record_success(&self, id: &str, tokens_saved: u64) {
        let now = self.clock.now();
        let requests = self
            .update(id, |entry| {
                entry.record_success(now, tokens_saved);
                entry.requests_today
            })
            .await;
        self.mark_dirty();
        debug!(provider = %id, requests_today = requests, tokens_saved, "Success recorded");
    }

    /// Records a failed request as `"{KIND}: {message}"`.
    pub async fn record_error(&self, id: &str, kind: ErrorKind, message: &str) {
        let record = ErrorRecord {
            at: self.clock.now(),
            message: format!("{kind}: {message}"),
        };
        let consecutive = self
            .update(id, |entry| {
                entry.push_error(record);
                entry.consecutive_errors
            })
            .await;
        self.mark_dirty();
        debug!(provider = %id, kind = %kind, consecutive_errors = consecutive, "Error recorded");
    }

    /// Puts a provider into cooldown until `until`.
    pub async fn mark_out_of_credits(&self, id: &str, until: DateTime<Utc>) {
        self.update(id, |entry| entry.out_of_credits_until = Some(until))
            .await;
        self.mark_dirty();
        info!(provider = %id, until = %until, "Provider in cooldown");
    }

    /// Clears one provider's counters, errors and cooldown.
    ///
    /// The lifetime token total survives.
    pub async fn reset_provider(&self, id: &str) {
        let today = self.clock.today();
        let mut state = self.state.write().await;
        if let Some(entry) = state.providers.get_mut(id) {
            entry.reset(today);
            self.mark_dirty();
            info!(provider = %id, "Provider state reset");
        }
    }

    /// Clears every provider, lifetime totals included.
    pub async fn reset_all(&self) {
        let mut state = self.state.write().await;
        state.providers.clear();
        self.mark_dirty();
        info!("All provider state reset");
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Writes the document if it changed since the last flush.
    ///
    /// Failures are logged and leave the document dirty so the next flush
    /// retries. In-memory managers only clear the flag.
    pub async fn flush(&self) {
        let _guard = self.flush_lock.lock().await;
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return;
        }
        let Some(path) = &self.path else {
            return;
        };

        let doc = self.snapshot().await;
        match save_json(path, &doc).await {
            Ok(()) => debug!(path = %path.display(), providers = doc.providers.len(), "State flushed"),
            Err(e) => {
                self.mark_dirty();
                warn!(path = %path.display(), error = %e, "Failed to save state");
            }
        }
    }

    /// Alias for [`StateManager::flush`].
    pub async fn save(&self) {
        self.flush().await;
    }

    /// Flushes every `period` until `cancel` fires, then flushes once more.
    pub fn spawn_autosave(self: Arc<Self>, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => self.flush().await,
                }
            }

            self.flush().await;
            debug!("Autosave stopped");
        })
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("path", &self.path)
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

async fn load_state(path: &Path) -> Result<FullState, StoreError> {
    let state: FullState = load_json(path).await?;
    if state.version > CURRENT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: state.version,
            supported: CURRENT_VERSION,
        });
    }
    Ok(state)
}
