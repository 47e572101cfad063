//! Extension units: drivers activated at runtime from a watched directory.
//!
//! An [`Activator`] turns one unit on disk into a batch of [`Registrations`];
//! the [`loader::ExtensionLoader`] commits each batch to the registry and
//! keeps watching the directory for new units.

pub mod dylib;
pub mod loader;
pub mod manifest;

pub use crate::core::registry::Registrations;
pub use dylib::DylibActivator;
pub use loader::{ExtensionLoader, LoaderError, LoaderOptions, LoaderState, Refresh, RunningLoader};
pub use manifest::ManifestActivator;

use crate::core::registry::RegistryError;
use std::path::{Path, PathBuf};

/// Version of the dynamic library interface. Bumped whenever
/// [`Registrations`] or [`crate::core::rate::RateProvider`] change shape.
pub const ABI_VERSION: u32 = 1;

/// Symbol of the `u32` static holding the driver's [`ABI_VERSION`].
pub const ABI_VERSION_SYMBOL: &[u8] = b"FOREX_DRIVER_ABI\0";

/// Symbol of the driver's [`RegisterFn`].
pub const REGISTER_SYMBOL: &[u8] = b"forex_register_drivers\0";

/// Entry point exported by a dynamic driver library.
pub type RegisterFn = fn(&mut Registrations);

/// Exports the symbols a dynamic driver library needs.
///
/// ```ignore
/// fn register(registrations: &mut forex::extension::Registrations) {
///     registrations.register("pegged", my_provider());
/// }
///
/// forex::declare_drivers!(register);
/// ```
#[macro_export]
macro_rules! declare_drivers {
    ($register:path) => {
        #[unsafe(no_mangle)]
        pub static FOREX_DRIVER_ABI: u32 = $crate::extension::ABI_VERSION;

        #[unsafe(no_mangle)]
        pub fn forex_register_drivers(registrations: &mut $crate::extension::Registrations) {
            $register(registrations)
        }
    };
}

#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    #[error("no activator for unit {}", .0.display())]
    Unsupported(PathBuf),

    #[error("failed to load {}: {message}", path.display())]
    LoadFailed { path: PathBuf, message: String },

    #[error("{} was built for driver ABI {found}, expected {expected}", path.display())]
    AbiMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("driver registration in {} panicked: {message}", path.display())]
    Panicked { path: PathBuf, message: String },

    #[error("invalid manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("activation of {} timed out", .0.display())]
    TimedOut(PathBuf),

    #[error("registering drivers from {}: {source}", path.display())]
    Registration {
        path: PathBuf,
        #[source]
        source: RegistryError,
    },
}

/// Strategy that activates one extension unit.
pub trait Activator: Send + Sync {
    /// Loads `unit` and returns the drivers it provides. Called from a blocking thread.
    fn activate(&self, unit: &Path) -> Result<Registrations, ActivationError>;
}

/// Picks an activator from the unit's file extension.
pub struct UnitActivator {
    dylib: DylibActivator,
    manifest: ManifestActivator,
}

impl UnitActivator {
    pub fn new(dylib: DylibActivator, manifest: ManifestActivator) -> Self {
        Self { dylib, manifest }
    }
}

impl Activator for UnitActivator {
    fn activate(&self, unit: &Path) -> Result<Registrations, ActivationError> {
        match unit.extension().and_then(|e| e.to_str()) {
            Some("so" | "dylib" | "dll") => self.dylib.activate(unit),
            Some("yaml" | "yml") => self.manifest.activate(unit),
            _ => Err(ActivationError::Unsupported(unit.to_path_buf())),
        }
    }
}
