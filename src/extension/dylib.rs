//! Activation of drivers compiled as dynamic libraries.
//!
//! The library must export the symbols generated by
//! [`declare_drivers!`](crate::declare_drivers) and be built with the same
//! compiler and `forex` version as the host, since the interface is the Rust ABI.

use super::{ABI_VERSION, ABI_VERSION_SYMBOL, ActivationError, Activator, REGISTER_SYMBOL, RegisterFn};
use crate::core::currency::Currency;
use crate::core::rate::{Rate, RateError, RateProvider};
use crate::core::registry::Registrations;
use async_trait::async_trait;
use libloading::{Library, Symbol};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct DylibActivator;

impl DylibActivator {
    pub fn new() -> Self {
        Self
    }
}

impl Activator for DylibActivator {
    fn activate(&self, unit: &Path) -> Result<Registrations, ActivationError> {
        let load_failed = |e: libloading::Error| ActivationError::LoadFailed {
            path: unit.to_path_buf(),
            message: e.to_string(),
        };

        debug!("Loading driver library {}", unit.display());
        let library = unsafe { Library::new(unit).map_err(load_failed)? };

        let found = unsafe {
            let abi: Symbol<*const u32> = library.get(ABI_VERSION_SYMBOL).map_err(load_failed)?;
            **abi
        };
        if found != ABI_VERSION {
            return Err(ActivationError::AbiMismatch {
                path: unit.to_path_buf(),
                found,
                expected: ABI_VERSION,
            });
        }

        let register: RegisterFn = unsafe {
            let symbol: Symbol<RegisterFn> = library.get(REGISTER_SYMBOL).map_err(load_failed)?;
            *symbol
        };

        let mut registrations = Registrations::new();
        catch_unwind(AssertUnwindSafe(|| register(&mut registrations))).map_err(|panic| {
            ActivationError::Panicked {
                path: unit.to_path_buf(),
                message: panic_message(panic.as_ref()),
            }
        })?;
        info!(
            drivers = ?registrations.names(),
            "Loaded driver library {}",
            unit.display()
        );

        let library = Arc::new(library);
        Ok(registrations.map_providers(|provider| {
            Arc::new(LibraryBound {
                provider,
                _library: Arc::clone(&library),
            })
        }))
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Keeps the library mapped for as long as a provider it created is alive.
struct LibraryBound {
    // Dropped before the library that holds its code
    provider: Arc<dyn RateProvider>,
    _library: Arc<Library>,
}

#[async_trait]
impl RateProvider for LibraryBound {
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<Rate, RateError> {
        self.provider.get_rate(from, to).await
    }
}
