use crate::core::currency::Currency;
use crate::core::rate::RateProvider;
use anyhow::{Result, bail};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

/// Parses a `C1,C2` line into two currencies.
pub fn parse_pair_input(input: &str) -> Result<(Currency, Currency)> {
    let currencies: Vec<&str> = input.trim().split(',').collect();
    if currencies.len() != 2 {
        bail!("requires two currency codes as input");
    }
    Ok((currencies[0].parse()?, currencies[1].parse()?))
}

/// Answers one `C1,C2` line at a time until the input ends.
///
/// Rates go to `out`; malformed lines and failed queries go to `err` and
/// the loop continues.
pub async fn run_interactive<R, W, E>(
    provider: &dyn RateProvider,
    input: R,
    mut out: W,
    mut err: E,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    E: Write,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let (from, to) = match parse_pair_input(&line) {
            Ok(pair) => pair,
            Err(e) => {
                writeln!(err, "{e}")?;
                continue;
            }
        };

        debug!(%from, %to, "Interactive rate request");
        match provider.get_rate(from, to).await {
            Ok(rate) => writeln!(out, "{rate}")?,
            Err(e) => writeln!(err, "{e}")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyPair;
    use crate::providers::fixed::FixedRates;

    #[test]
    fn test_parse_pair_input() {
        assert_eq!(
            parse_pair_input("USD,CAD\n").unwrap(),
            (Currency::USD, Currency::CAD)
        );
        assert_eq!(
            parse_pair_input("eur, gbp").unwrap(),
            (Currency::EUR, Currency::GBP)
        );
        assert_eq!(
            parse_pair_input("USD").unwrap_err().to_string(),
            "requires two currency codes as input"
        );
        assert!(parse_pair_input("USD,CAD,EUR").is_err());
        assert!(parse_pair_input("USD,C").is_err());
    }

    #[tokio::test]
    async fn test_run_interactive() {
        let provider = FixedRates::new()
            .with_rate(CurrencyPair::new(Currency::USD, Currency::CAD), 1.25)
            .into_provider();
        let input: &[u8] = b"USD,CAD\nnonsense\n\nCAD,USD\nCAD,CAD\nEUR,USD\n";
        let mut out = Vec::new();
        let mut err = Vec::new();

        run_interactive(&provider, input, &mut out, &mut err)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "1250000\n800000\n1000000\n");
        let err = String::from_utf8(err).unwrap();
        assert!(err.contains("requires two currency codes as input"));
        assert!(err.contains("response did not include rate EURUSD"));
    }
}
