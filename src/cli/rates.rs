use super::ui;
use crate::core::currency::CurrencyPair;
use crate::core::rate::{PARITY, Rate, RateError};
use crate::core::registry::Registry;
use comfy_table::Cell;
use futures::future::join_all;
use tracing::warn;

#[derive(Debug)]
pub struct DriverRate {
    pub driver: String,
    pub rate: Result<Rate, RateError>,
}

/// Formats a fixed-point rate as a decimal, e.g. `1345679` as `1.345679`.
pub fn format_rate(rate: Rate) -> String {
    let sign = if rate < 0 { "-" } else { "" };
    let rate = rate.unsigned_abs();
    let parity = PARITY as u64;
    format!("{sign}{}.{:06}", rate / parity, rate % parity)
}

/// Queries `pair` from every registered driver concurrently.
pub async fn collect_rates(registry: &Registry, pair: CurrencyPair) -> Vec<DriverRate> {
    let names = registry.registered();
    let pb = ui::new_progress_bar(names.len() as u64);
    pb.set_message(format!("Fetching {pair}"));

    let futures = names.into_iter().map(|driver| {
        let pb = pb.clone();
        async move {
            let rate = match registry.open(&driver) {
                Some(provider) => provider.get_rate(pair.base, pair.quote).await,
                None => Err(anyhow::anyhow!("driver {driver} disappeared").into()),
            };
            if let Err(e) = &rate {
                warn!(driver = %driver, error = %e, "Failed to fetch rate");
            }
            pb.inc(1);
            DriverRate { driver, rate }
        }
    });
    let rates = join_all(futures).await;
    pb.finish_and_clear();
    rates
}

pub fn rates_table(pair: CurrencyPair, rates: &[DriverRate]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Driver"),
        ui::header_cell("Pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Fixed point"),
    ]);

    for entry in rates {
        let (rate, fixed) = match &entry.rate {
            Ok(rate) => (
                ui::number_cell(format_rate(*rate)),
                ui::number_cell(rate.to_string()),
            ),
            Err(_) => (ui::na_cell(), ui::na_cell()),
        };
        table.add_row(vec![
            Cell::new(&entry.driver),
            Cell::new(pair.to_string()),
            rate,
            fixed,
        ]);
    }

    table.to_string()
}

/// Prints a table with `pair` quoted by every registered driver.
pub async fn display_rates(registry: &Registry, pair: CurrencyPair) {
    let rates = collect_rates(registry, pair).await;
    println!("{}", rates_table(pair, &rates));
    for entry in rates.iter().filter(|r| r.rate.is_err()) {
        if let Err(e) = &entry.rate {
            eprintln!(
                "{}",
                ui::style_text(&format!("{}: {e}", entry.driver), ui::StyleType::Error)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use crate::providers::fixed::FixedRates;
    use std::sync::Arc;

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(PARITY), "1.000000");
        assert_eq!(format_rate(1_345_679), "1.345679");
        assert_eq!(format_rate(740_741), "0.740741");
        assert_eq!(format_rate(-1), "-0.000001");
    }

    #[tokio::test]
    async fn test_collect_rates_reports_each_driver() {
        let registry = Registry::new();
        let usdcad = FixedRates::new().with_rate(CurrencyPair::new(Currency::USD, Currency::CAD), 1.25);
        registry.register("pegged", Arc::new(usdcad.into_provider()));
        registry.register("empty", Arc::new(FixedRates::new().into_provider()));

        let pair = CurrencyPair::new(Currency::USD, Currency::CAD);
        let rates = collect_rates(&registry, pair).await;
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].driver, "empty");
        assert!(rates[0].rate.is_err());
        assert_eq!(rates[1].driver, "pegged");
        assert_eq!(*rates[1].rate.as_ref().unwrap(), 1_250_000);

        let table = rates_table(pair, &rates);
        assert!(table.contains("pegged"));
        assert!(table.contains("1.250000"));
        assert!(table.contains("USDCAD"));
        assert!(table.contains("N/A"));
    }
}
