use super::{rates, ui};
use crate::core::currency::CurrencyPair;
use crate::core::registry::Registry;
use crate::extension::{Activator, ExtensionLoader, LoaderError, LoaderOptions};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Loads the extension directory, then reprints the rate table after every activation.
///
/// Only returns on a fatal loader error.
pub async fn run_watch(
    registry: Arc<Registry>,
    dir: &Path,
    activator: Arc<dyn Activator>,
    options: LoaderOptions,
    pair: CurrencyPair,
) -> Result<()> {
    let loader = ExtensionLoader::new(dir, Arc::clone(&registry), activator, options);
    let mut running = loader
        .start()
        .await
        .with_context(|| format!("Failed to load extensions from {}", dir.display()))?;
    let mut refreshes = running.subscribe();

    rates::display_rates(&registry, pair).await;

    let watch_result = loop {
        tokio::select! {
            result = running.wait() => break result,
            refresh = refreshes.recv() => match refresh {
                Ok(refresh) => {
                    println!(
                        "{}",
                        ui::style_text(
                            &format!(
                                "{} activated at {}: {}",
                                refresh.unit.display(),
                                refresh.activated_at.format("%Y-%m-%d %H:%M:%S"),
                                refresh.drivers.join(", ")
                            ),
                            ui::StyleType::Subtle,
                        )
                    );
                    rates::display_rates(&registry, pair).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed refresh notifications");
                    rates::display_rates(&registry, pair).await;
                }
                Err(RecvError::Closed) => break Err(LoaderError::Closed),
            },
        }
    };

    watch_result.with_context(|| format!("Stopped watching {}", dir.display()))
}
