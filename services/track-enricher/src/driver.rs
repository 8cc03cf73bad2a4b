//!
//! src/driver.rs  Oct 16th, 2026
//!
//! Defines the batch driver: load the csv, authenticate once, then walk
//! the rows in order enriching every unprocessed one and persisting the
//! whole file after each success. Rows are strictly sequential and paced
//!

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::{authenticate, Credentials};
use crate::config::{AppConfig, DatasetConfig, RetryConfig};
use crate::dataset::Dataset;
use crate::enricher::TrackEnricher;
use crate::errors::EnricherError;
use crate::fetch::CatalogApi;
use crate::types::{Enrichment, ProcessedFlag};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub skipped: usize,
    pub enriched: usize,
    pub failed: usize,
    pub cancelled: bool
}

pub struct BatchDriver<'a, A: CatalogApi + ?Sized> {
    api: &'a A,
    creds: Credentials,
    retry: RetryConfig,
    dataset: DatasetConfig,
    pacing: Duration,

    // stops the loop, abandoning any in-flight row
    shutdown: CancellationToken
}

impl<'a, A: CatalogApi + ?Sized> BatchDriver<'a, A> {
    pub fn new(
        api: &'a A,
        creds: Credentials,
        retry: RetryConfig,
        dataset: DatasetConfig,
        pacing: Duration
    ) -> Self {
        Self { api, creds, retry, dataset, pacing, shutdown: CancellationToken::new() }
    }

    pub fn from_config(cfg: &AppConfig, api: &'a A) -> Self {
        Self::new(
            api,
            Credentials::from_config(&cfg.spotify),
            cfg.retry.clone(),
            cfg.dataset.clone(),
            cfg.pacing.between_rows
        )
    }

    pub fn shutdown(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    ///
    /// Runs one pass over the dataset. Safe to repeat: rows marked
    /// Processed are skipped without any network call.
    ///
    pub async fn run(&self) -> Result<RunSummary, EnricherError> {
        let mut data = Dataset::load(&self.dataset.path)?;
        data.prepare(&self.dataset.uri_column)?;

        let mut summary = RunSummary { total: data.len(), ..RunSummary::default() };
        info!(
            path = %data.path().display(), rows = data.len(),
            columns = data.headers().len(), "driver.start"
        );
        if data.is_empty() {
            return Ok(summary);
        }

        let mut token = authenticate(self.api, &self.creds).await?;
        let enricher = TrackEnricher::new(self.api, self.creds.clone(), self.retry.clone());

        for row in 0..data.len() {
            if self.shutdown.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            if data.processed(row) == ProcessedFlag::Yes {
                info!(row, track = ?data.track_id(row).map(|t| t.0), "driver.row.skip");
                summary.skipped += 1;
                continue;
            }

            let Some(track_id) = data.track_id(row) else {
                warn!(row, "driver.row.no_track_id");
                summary.failed += 1;
                continue;
            };

            // an abandoned row stays No and is picked up on the next run
            let outcome = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    warn!(row, track = %track_id, "driver.row.abandoned");
                    summary.cancelled = true;
                    break;
                }
                outcome = enricher.enrich(&track_id, token) => outcome?
            };

            match outcome {
                Enrichment::Found(result) => {
                    data.apply(row, &result);
                    data.save()?;
                    token = result.token;
                    summary.enriched += 1;
                    info!(row, track = %track_id, "driver.row.done");
                }
                Enrichment::NotFound { token: current } => {
                    token = current;
                    summary.failed += 1;
                    warn!(row, track = %track_id, "driver.row.unprocessed");
                }
            }

            if row + 1 < data.len() {
                tokio::select! {
                    () = self.shutdown.cancelled() => {
                        summary.cancelled = true;
                        break;
                    }
                    () = sleep(self.pacing) => {}
                }
            }
        }

        if summary.cancelled {
            warn!(?summary, "driver.cancelled");
        }
        info!(?summary, "driver.complete");
        Ok(summary)
    }
}
