//! Shared server state handed to every request handler

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, DEFAULT_STORAGE_TIMEOUT_SECS};
use crate::roots::RootSet;
use crate::watch::WatchLog;

/// Server state: the immutable root set plus the shared watch log
#[derive(Clone)]
pub struct ServerState {
    /// Directories browsable without a token
    roots: Arc<RootSet>,
    /// Sink for playback-start events
    watch_log: WatchLog,
    /// Upper bound for a single filesystem call
    storage_timeout: Duration,
    /// Refuse paths outside the roots
    confine_to_roots: bool,
}

impl ServerState {
    /// Create new server state
    ///
    /// # Arguments
    /// * `roots` - Directories browsable without a token
    /// * `watch_log` - Sink for playback-start events
    pub fn new(roots: RootSet, watch_log: WatchLog) -> Self {
        Self {
            roots: Arc::new(roots),
            watch_log,
            storage_timeout: Duration::from_secs(DEFAULT_STORAGE_TIMEOUT_SECS),
            confine_to_roots: false,
        }
    }

    /// Build state from loaded configuration, opening the watch log file
    pub async fn from_config(config: &Config) -> std::io::Result<Self> {
        let watch_log = match &config.watch_log {
            Some(path) => WatchLog::with_file(path).await?,
            None => WatchLog::tracing_only(),
        };
        Ok(Self::new(config.root_set(), watch_log)
            .with_storage_timeout(config.storage_timeout())
            .with_confinement(config.confine_to_roots))
    }

    /// Set the per-call filesystem timeout
    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    /// Refuse tokens that decode outside the roots
    pub fn with_confinement(mut self, confine: bool) -> Self {
        self.confine_to_roots = confine;
        self
    }

    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    pub fn watch_log(&self) -> &WatchLog {
        &self.watch_log
    }

    pub fn storage_timeout(&self) -> Duration {
        self.storage_timeout
    }

    /// Whether a decoded path may be served
    ///
    /// Always true unless confinement is switched on.
    pub fn allows(&self, path: &Path) -> bool {
        !self.confine_to_roots || self.roots.confines(path)
    }
}
