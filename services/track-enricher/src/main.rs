//!
//! src/main.rs  Oct 16th, 2026
//!
//! Entry point of the track enricher. Loads config, starts the logger
//! and runs one pass of the batch driver over the configured csv
//!
//!

mod config;
mod errors;
mod logging;
mod types;

mod auth;
mod dataset;
mod driver;
mod enricher;
mod fetch;

#[cfg(test)]
mod testing;

use tracing::Instrument;
use uuid::Uuid;

use crate::errors::EnricherError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), EnricherError> {
    let cfgs    = config::load_config()?;
    let _logger = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service="track-enricher",
        version=%env!("CARGO_PKG_VERSION"),
        config=?cfgs,
        "starting"
    );

    let spotify = fetch::SpotifyClient::new(&cfgs.http, &cfgs.spotify)?;
    let driver  = driver::BatchDriver::from_config(&cfgs, &spotify);

    let shutdown = driver.shutdown();
    let trigger = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(msg = "abandoning in-flight row", "enricher.signal");
            shutdown.cancel();
        }
        // a second interrupt exits without waiting for the driver
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("enricher.signal.forced");
            std::process::exit(130);
        }
    });

    let span = tracing::info_span!("run", run_id = %Uuid::new_v4());
    let result = driver.run().instrument(span).await;
    trigger.abort();

    match result {
        Ok(summary) => {
            tracing::info!(?summary, "enricher.exit");
            println!(
                "Spotify data processing complete! {}/{} enriched, {} skipped, {} left unprocessed",
                summary.enriched, summary.total, summary.skipped, summary.failed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "enricher.abort");
            Err(e)
        }
    }
}
