//!
//! src/auth.rs  Oct 16th, 2026
//!
//! Exchanges the client id/secret pair for a bearer token via the
//! client-credentials grant. No retry here, callers decide
//!

use tracing::{debug, warn};

use crate::config::SpotifyConfig;
use crate::errors::EnricherError;
use crate::fetch::CatalogApi;
use crate::types::{AccessToken, TokenPayload};

#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String
}

impl Credentials {
    pub fn from_config(cfg: &SpotifyConfig) -> Self {
        Self { client_id: cfg.client_id.clone(), client_secret: cfg.client_secret.clone() }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// Single client-credentials exchange. Any transport error, non-2xx status
/// or body without access_token is an Auth error.
pub async fn authenticate<A: CatalogApi + ?Sized>(api: &A, creds: &Credentials) ->
    Result<AccessToken, EnricherError> {
    if creds.client_id.is_empty() || creds.client_secret.is_empty() {
        return Err(EnricherError::Auth("empty client credentials".to_string()));
    }

    let response = api.request_token(&creds.client_id, &creds.client_secret)
        .await
        .map_err(|e| EnricherError::Auth(format!("token request: {e}")))?;

    if !response.is_success() {
        warn!(status = response.status, "auth.token.rejected");
        return Err(EnricherError::Auth(format!("token endpoint returned {}", response.status)));
    }

    let payload: TokenPayload = response.json()
        .map_err(|e| EnricherError::Auth(format!("token body: {e}")))?;

    match payload.access_token {
        Some(token) if !token.is_empty() => {
            debug!(
                token_type = payload.token_type.as_deref().unwrap_or("unknown"),
                expires_in = ?payload.expires_in,
                "auth.token.issued"
            );
            Ok(AccessToken::new(token))
        }
        _ => Err(EnricherError::Auth("response lacks access_token".to_string()))
    }
}
