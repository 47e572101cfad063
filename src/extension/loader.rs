//! Activates every unit in an extension directory, then keeps watching it.
//!
//! The loader is `Starting` while it activates the units already present and
//! `Watching` afterwards. Any failure while starting is returned from
//! [`ExtensionLoader::start`]. Once watching, only newly created files are
//! activated, one at a time, and a failure is handled per [`FailurePolicy`].
//! [`ExtensionLoader::load`] only does the first part.

use super::{ActivationError, Activator};
use crate::core::config::{ExtensionsConfig, FailurePolicy};
use crate::core::registry::Registry;
use chrono::{DateTime, Utc};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const REFRESH_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Starting,
    Watching,
}

/// Sent after every successful activation so observers can re-read the registry.
#[derive(Debug, Clone)]
pub struct Refresh {
    pub unit: PathBuf,
    pub drivers: Vec<String>,
    pub activated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Wait between a creation event and activation, so the writer can finish
    pub settle_delay: Duration,
    pub activation_timeout: Option<Duration>,
    pub on_failure: FailurePolicy,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self::from(&ExtensionsConfig::default())
    }
}

impl From<&ExtensionsConfig> for LoaderOptions {
    fn from(config: &ExtensionsConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            activation_timeout: config.activation_timeout_secs.map(Duration::from_secs),
            on_failure: config.on_failure,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("failed to read extension directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to watch extension directory {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error(transparent)]
    Activation(#[from] ActivationError),

    #[error("extension watcher task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("extension watcher stopped")]
    Closed,
}

pub struct ExtensionLoader {
    dir: PathBuf,
    registry: Arc<Registry>,
    activator: Arc<dyn Activator>,
    options: LoaderOptions,
    state: watch::Sender<LoaderState>,
    refresh: broadcast::Sender<Refresh>,
    activated: HashSet<PathBuf>,
}

impl ExtensionLoader {
    pub fn new(
        dir: impl Into<PathBuf>,
        registry: Arc<Registry>,
        activator: Arc<dyn Activator>,
        options: LoaderOptions,
    ) -> Self {
        let (state, _) = watch::channel(LoaderState::Starting);
        let (refresh, _) = broadcast::channel(REFRESH_CAPACITY);
        Self {
            dir: dir.into(),
            registry,
            activator,
            options,
            state,
            refresh,
            activated: HashSet::new(),
        }
    }

    /// Subscribes to refreshes, including the ones sent while starting.
    pub fn subscribe(&self) -> broadcast::Receiver<Refresh> {
        self.refresh.subscribe()
    }

    pub fn state(&self) -> watch::Receiver<LoaderState> {
        self.state.subscribe()
    }

    /// Activates the units already in the directory once, without watching it.
    pub async fn load(mut self) -> Result<Vec<Refresh>, LoaderError> {
        self.resolve_dir()?;
        self.activate_existing().await
    }

    /// Activates the units already in the directory and spawns the watch task.
    pub async fn start(mut self) -> Result<RunningLoader, LoaderError> {
        self.resolve_dir()?;

        // Watch before listing so units dropped during startup are not missed
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        )
        .map_err(|source| self.watch_error(source))?;
        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|source| self.watch_error(source))?;

        self.activate_existing().await?;

        self.state.send_replace(LoaderState::Watching);
        info!("Watching {} for new extension units", self.dir.display());

        let state = self.state.subscribe();
        let refresh = self.refresh.clone();
        let handle = tokio::spawn(self.watch(watcher, rx));
        Ok(RunningLoader {
            handle: Some(handle),
            state,
            refresh,
        })
    }

    fn resolve_dir(&mut self) -> Result<(), LoaderError> {
        self.dir = std::fs::canonicalize(&self.dir).map_err(|source| LoaderError::ReadDir {
            path: self.dir.clone(),
            source,
        })?;
        Ok(())
    }

    async fn activate_existing(&mut self) -> Result<Vec<Refresh>, LoaderError> {
        let units = self.existing_units()?;
        info!(
            "Activating {} existing extension units in {}",
            units.len(),
            self.dir.display()
        );
        let mut refreshes = Vec::with_capacity(units.len());
        for unit in units {
            refreshes.push(self.activate(unit).await?);
        }
        Ok(refreshes)
    }

    fn watch_error(&self, source: notify::Error) -> LoaderError {
        LoaderError::Watch {
            path: self.dir.clone(),
            source,
        }
    }

    fn existing_units(&self) -> Result<Vec<PathBuf>, LoaderError> {
        let read_error = |source| LoaderError::ReadDir {
            path: self.dir.clone(),
            source,
        };

        let mut units = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            if entry.file_type().map_err(read_error)?.is_dir() {
                continue;
            }
            units.push(entry.path());
        }
        units.sort();
        Ok(units)
    }

    async fn watch(
        mut self,
        // Dropping the watcher would stop the events
        _watcher: RecommendedWatcher,
        mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    ) -> Result<(), LoaderError> {
        while let Some(event) = events.recv().await {
            let event = event.map_err(|source| self.watch_error(source))?;
            if !matches!(event.kind, EventKind::Create(_)) {
                continue;
            }

            for unit in event.paths {
                if !self.is_new_unit(&unit) {
                    continue;
                }
                if !self.options.settle_delay.is_zero() {
                    tokio::time::sleep(self.options.settle_delay).await;
                }

                if let Err(e) = self.activate(unit.clone()).await {
                    match self.options.on_failure {
                        FailurePolicy::Fatal => {
                            error!(unit = %unit.display(), error = %e, "Extension activation failed");
                            return Err(e.into());
                        }
                        FailurePolicy::Skip => {
                            warn!(unit = %unit.display(), error = %e, "Skipping extension unit");
                        }
                    }
                }
            }
        }
        Err(LoaderError::Closed)
    }

    fn is_new_unit(&self, path: &Path) -> bool {
        if self.activated.contains(path) {
            debug!("Already activated {}", path.display());
            return false;
        }
        !path.is_dir()
    }

    async fn activate(&mut self, unit: PathBuf) -> Result<Refresh, ActivationError> {
        debug!("Activating extension unit {}", unit.display());

        let activator = Arc::clone(&self.activator);
        let path = unit.clone();
        let task = tokio::task::spawn_blocking(move || activator.activate(&path));

        // A timed out load keeps its blocking thread; only the wait is abandoned
        let joined = match self.options.activation_timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| ActivationError::TimedOut(unit.clone()))?,
            None => task.await,
        };
        let registrations = joined.map_err(|e| ActivationError::Panicked {
            path: unit.clone(),
            message: e.to_string(),
        })??;

        let drivers = self
            .registry
            .register_all(registrations)
            .map_err(|source| ActivationError::Registration {
                path: unit.clone(),
                source,
            })?;
        self.activated.insert(unit.clone());

        info!(?drivers, "Activated extension unit {}", unit.display());
        let refresh = Refresh {
            unit,
            drivers,
            activated_at: Utc::now(),
        };
        // No subscribers is fine
        let _ = self.refresh.send(refresh.clone());
        Ok(refresh)
    }
}

/// Handle to a loader that finished starting and is watching its directory.
pub struct RunningLoader {
    handle: Option<JoinHandle<Result<(), LoaderError>>>,
    state: watch::Receiver<LoaderState>,
    refresh: broadcast::Sender<Refresh>,
}

impl RunningLoader {
    pub fn state(&self) -> LoaderState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Refresh> {
        self.refresh.subscribe()
    }

    /// Waits for the watch task, which only ends with an error. Cancel safe.
    pub async fn wait(&mut self) -> Result<(), LoaderError> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(LoaderError::Closed);
        };
        let result = handle.await;
        self.handle = None;
        result?
    }

    pub fn abort(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

impl Drop for RunningLoader {
    fn drop(&mut self) {
        self.abort();
    }
}
