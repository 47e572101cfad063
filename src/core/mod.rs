//! Core driver abstractions

pub mod canonical;
pub mod config;
pub mod currency;
pub mod log;
pub mod rate;
pub mod registry;

// Re-export main types for cleaner imports
pub use canonical::{AsymmetricSource, CanonicalProvider, PriorityTable};
pub use currency::{Currency, CurrencyPair};
pub use rate::{PARITY, Rate, RateError, RateProvider};
pub use registry::{Registrations, Registry, RegistryError};
