//! Name to driver table shared by the CLI and the extension loader.

use crate::core::rate::RateProvider;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("forex: Register called twice for driver {0}")]
    Duplicate(String),

    #[error("forex: Register driver name is empty")]
    EmptyName,

    #[error("No driver registered as {0}")]
    NotFound(String),
}

/// Drivers produced by one extension unit, committed to a [`Registry`] together.
#[derive(Default)]
pub struct Registrations {
    entries: Vec<(String, Arc<dyn RateProvider>)>,
}

impl Registrations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P>(&mut self, name: impl Into<String>, provider: P)
    where
        P: RateProvider + 'static,
    {
        self.register_arc(name, Arc::new(provider));
    }

    pub fn register_arc(&mut self, name: impl Into<String>, provider: Arc<dyn RateProvider>) {
        self.entries.push((name.into(), provider));
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces every provider with `wrap(provider)`, keeping the names.
    pub fn map_providers<F>(self, mut wrap: F) -> Self
    where
        F: FnMut(Arc<dyn RateProvider>) -> Arc<dyn RateProvider>,
    {
        Self {
            entries: self
                .entries
                .into_iter()
                .map(|(name, provider)| (name, wrap(provider)))
                .collect(),
        }
    }
}

impl fmt::Debug for Registrations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registrations")
            .field("names", &self.names())
            .finish()
    }
}

/// Thread-safe table of registered drivers. Entries are never removed.
#[derive(Default)]
pub struct Registry {
    drivers: RwLock<HashMap<String, Arc<dyn RateProvider>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty or already registered. Both indicate a wiring
    /// defect rather than a runtime condition.
    pub fn register(&self, name: &str, provider: Arc<dyn RateProvider>) {
        if let Err(e) = self.try_register(name, provider) {
            panic!("{e}");
        }
    }

    pub fn try_register(
        &self,
        name: &str,
        provider: Arc<dyn RateProvider>,
    ) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let mut drivers = self.drivers.write().unwrap_or_else(PoisonError::into_inner);
        if drivers.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        drivers.insert(name.to_string(), provider);
        debug!(driver = name, "Registered driver");
        Ok(())
    }

    /// Commits a whole batch, or nothing if any name is empty or taken.
    pub fn register_all(&self, registrations: Registrations) -> Result<Vec<String>, RegistryError> {
        let mut drivers = self.drivers.write().unwrap_or_else(PoisonError::into_inner);

        let mut seen = HashSet::new();
        for (name, _) in &registrations.entries {
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if drivers.contains_key(name) || !seen.insert(name.as_str()) {
                return Err(RegistryError::Duplicate(name.clone()));
            }
        }

        let names = registrations.names();
        for (name, provider) in registrations.entries {
            debug!(driver = %name, "Registered driver");
            drivers.insert(name, provider);
        }
        Ok(names)
    }

    /// Returns the driver registered as `name`, or `None`.
    pub fn open(&self, name: &str) -> Option<Arc<dyn RateProvider>> {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<dyn RateProvider>, RegistryError> {
        self.open(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Snapshot of registered names, sorted.
    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
