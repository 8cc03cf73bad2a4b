//!
//! src/enricher.rs  Oct 16th, 2026
//!
//! Fetches track metadata, primary artist genres and audio features
//! for one track id and assembles them into a single result.
//!
//! Expired tokens (401) are refreshed at most once per track. Rate limits
//! (429) honour Retry-After, 5xx and transport errors back off
//! exponentially, and both stop after RetryConfig::max_attempts.
//!

use std::time::Duration;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::auth::{authenticate, Credentials};
use crate::config::RetryConfig;
use crate::errors::EnricherError;
use crate::fetch::{ApiResponse, CatalogApi, Endpoint};
use crate::types::{
    AccessToken, ArtistPayload, AudioFeatures, Enrichment, EnrichmentResult,
    TrackId, TrackPayload
};

/// Simple function to generate random wait for retried requests
fn generate_backoff(base: Duration, attempt: u8, jitter: bool, rng: &mut SmallRng) -> Duration {
    let exp = base.saturating_mul(1_u32 << attempt.min(6));
    let jitter = if jitter { rng.gen_range(50..=200) } else { 0 };
    exp + Duration::from_millis(jitter)
}

/// Token state carried across the three calls made for one track
struct Session {
    token: AccessToken,
    refreshed: bool,
    rng: SmallRng
}

pub struct TrackEnricher<'a, A: CatalogApi + ?Sized> {
    api: &'a A,
    creds: Credentials,
    retry: RetryConfig
}

impl<'a, A: CatalogApi + ?Sized> TrackEnricher<'a, A> {
    pub fn new(api: &'a A, creds: Credentials, retry: RetryConfig) -> Self {
        Self { api, creds, retry }
    }

    ///
    /// Enriches one track. Fetch failures on any of the three calls are
    /// logged and reported as NotFound so the batch can continue, only a
    /// failed token refresh is returned as an error.
    ///
    pub async fn enrich(&self, track_id: &TrackId, token: AccessToken) ->
        Result<Enrichment, EnricherError> {
        let mut session = Session {
            token,
            refreshed: false,
            rng: SmallRng::from_entropy()
        };

        match self.fetch_all(track_id, &mut session).await {
            Ok(found) => {
                info!(track = %track_id, "enrich.track.done");
                Ok(Enrichment::Found(EnrichmentResult { token: session.token, ..found }))
            }
            Err(e) if e.is_soft() => {
                warn!(track = %track_id, error = %e, "enrich.track.failed");
                Ok(Enrichment::NotFound { token: session.token })
            }
            Err(e) => Err(e)
        }
    }

    async fn fetch_all(&self, track_id: &TrackId, session: &mut Session) ->
        Result<EnrichmentResult, EnricherError> {
        let track: TrackPayload = self.fetch(Endpoint::Track(track_id.as_str()), session)
            .await?
            .json()?;

        let artist_id = track.primary_artist()
            .ok_or_else(|| EnricherError::Parse(format!("track {track_id} has no artist id")))?;

        let artist: ArtistPayload = self.fetch(Endpoint::Artist(&artist_id.0), session)
            .await?
            .json()?;

        let features: AudioFeatures = self.fetch(
            Endpoint::AudioFeatures(track_id.as_str()), session)
            .await?
            .json()?;

        Ok( EnrichmentResult {
            genres: artist.joined_genres(),
            release_date: track.album.release_date.clone(),
            popularity: track.popularity,
            album_image_url: track.album_image_url(),
            features,
            token: session.token.clone()
        })
    }

    /// One endpoint with refresh-once on 401 and bounded retry on 429/5xx
    async fn fetch(&self, endpoint: Endpoint<'_>, session: &mut Session) ->
        Result<ApiResponse, EnricherError> {
        let mut failures: u8 = 0;
        loop {
            let response = match self.api.get(endpoint, session.token.as_str()).await {
                Ok(response) => response,
                Err(e) if !e.is_soft() => return Err(e),
                Err(e) => {
                    failures += 1;
                    self.check_budget(endpoint, failures)?;
                    let backoff = generate_backoff(
                        self.retry.base_backoff, failures - 1, self.retry.jitter, &mut session.rng
                    );
                    warn!(
                        endpoint = endpoint.name(), error = %e,
                        backoff_ms = backoff.as_millis() as u64, "http.retry.error"
                    );
                    sleep(backoff).await;
                    continue;
                }
            };

            match response.status {
                _ if response.is_success() => {
                    debug!(endpoint = endpoint.name(), status = response.status, "http.ok");
                    return Ok(response);
                }
                401 if !session.refreshed => {
                    warn!(endpoint = endpoint.name(), "enrich.token.expired");
                    session.token = authenticate(self.api, &self.creds).await?;
                    session.refreshed = true;
                }
                429 => {
                    failures += 1;
                    self.check_budget(endpoint, failures)?;
                    let wait = response.retry_after
                        .unwrap_or(self.retry.default_retry_after)
                        .min(self.retry.max_retry_after);
                    warn!(
                        endpoint = endpoint.name(), retry_after_s = wait.as_secs(),
                        "http.rate_limited"
                    );
                    sleep(wait).await;
                }
                status if status >= 500 => {
                    failures += 1;
                    self.check_budget(endpoint, failures)?;
                    let backoff = generate_backoff(
                        self.retry.base_backoff, failures - 1, self.retry.jitter, &mut session.rng
                    );
                    warn!(
                        endpoint = endpoint.name(), status,
                        backoff_ms = backoff.as_millis() as u64, "http.retry"
                    );
                    sleep(backoff).await;
                }
                status => {
                    return Err(EnricherError::Status {
                        status,
                        endpoint: endpoint.name().to_string()
                    });
                }
            }
        }
    }

    fn check_budget(&self, endpoint: Endpoint<'_>, failures: u8) -> Result<(), EnricherError> {
        if failures >= self.retry.max_attempts {
            Err(EnricherError::RetryExhausted {
                endpoint: endpoint.name().to_string(),
                attempts: failures
            })
        } else {
            Ok(())
        }
    }
}
