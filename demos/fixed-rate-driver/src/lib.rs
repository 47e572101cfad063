//! Build with `cargo build -p fixed-rate-driver` and copy the resulting
//! `libfixed_rate_driver.so` (or `.dylib`/`.dll`) into the directory passed to
//! `forex watch`. It must be built by the same toolchain as the `forex` binary.

use forex::core::currency::{Currency, CurrencyPair};
use forex::extension::Registrations;
use forex::providers::fixed::FixedRates;

fn register(registrations: &mut Registrations) {
    let pegged = FixedRates::new()
        .with_rate(CurrencyPair::new(Currency::EUR, Currency::USD), 1.10)
        .with_rate(CurrencyPair::new(Currency::USD, Currency::CAD), 1.35)
        .with_rate(CurrencyPair::new(Currency::GBP, Currency::USD), 1.27);
    registrations.register("pegged", pegged.into_provider());
}

forex::declare_drivers!(register);
