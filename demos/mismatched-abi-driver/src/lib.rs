//! Exports a driver ABI one ahead of the host's, as a library built against a
//! newer `forex` would. `forex` must refuse to activate it.

use forex::extension::Registrations;
use forex::providers::fixed::FixedRates;

#[unsafe(no_mangle)]
pub static FOREX_DRIVER_ABI: u32 = forex::extension::ABI_VERSION + 1;

#[unsafe(no_mangle)]
pub fn forex_register_drivers(registrations: &mut Registrations) {
    registrations.register("stale", FixedRates::new().into_provider());
}
