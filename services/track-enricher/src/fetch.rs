//!
//! src/fetch.rs  Oct 16th, 2026
//!
//! Defines methods for hitting the catalog endpoints and returning
//! unparsed responses. Status handling and retries live in the enricher
//!

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header, redirect, RequestBuilder};
use url::Url;

use crate::config::{HttpConfig, SpotifyConfig};
use crate::errors::EnricherError;

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder  {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, EnricherError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_helper(http)
        .default_headers(h)
        .user_agent(concat!("track-enricher/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| EnricherError::Http(format!("build client: {e}")))
}

/// The three lookups made per track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Track(&'a str),
    Artist(&'a str),
    AudioFeatures(&'a str)
}

impl Endpoint<'_> {
    pub fn path(&self) -> String {
        match self {
            Endpoint::Track(id)         => format!("tracks/{id}"),
            Endpoint::Artist(id)        => format!("artists/{id}"),
            Endpoint::AudioFeatures(id) => format!("audio-features/{id}")
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Track(_)         => "tracks",
            Endpoint::Artist(_)        => "artists",
            Endpoint::AudioFeatures(_) => "audio-features"
        }
    }
}

/// Status, Retry-After and raw body of one call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: String
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, EnricherError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    async fn from_reqwest(response: reqwest::Response) -> Result<Self, EnricherError> {
        let status = response.status().as_u16();
        let retry_after = response.headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await?;
        Ok( Self { status, retry_after, body } )
    }
}

/// Retry-After in delta-seconds, the only form the catalog sends
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

///
/// Seam between the enricher and the network, lets tests script responses
///
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Client-credentials grant
    async fn request_token(&self, client_id: &str, client_secret: &str) ->
        Result<ApiResponse, EnricherError>;

    /// Bearer-authenticated GET of one endpoint
    async fn get(&self, endpoint: Endpoint<'_>, bearer: &str) ->
        Result<ApiResponse, EnricherError>;
}

#[derive(Clone, Debug)]
pub struct SpotifyClient {
    pub http: Client,
    pub token_url: Url,
    pub api_base: Url
}

impl SpotifyClient {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) ->
        Result<Self, EnricherError> {

        let http = base_client(http_config)?;
        Ok( Self {
            http,
            token_url: cfg.token_url.clone(),
            api_base: cfg.api_base.clone()
        })
    }

    /// POST {token_url} with grant_type=client_credentials
    pub fn token_request(&self, client_id: &str, client_secret: &str) -> RequestBuilder {
        self.http
            .post(self.token_url.clone())
            .basic_auth(client_id, Some(client_secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
    }

    fn endpoint_url(&self, endpoint: Endpoint<'_>) -> Result<Url, EnricherError> {
        self.api_base.join(&endpoint.path())
            .map_err(|e| EnricherError::Config(format!("join {}: {e}", endpoint.path())))
    }

    /// GET {api_base}/{endpoint path}, bearer authenticated
    pub fn endpoint(&self, endpoint: Endpoint<'_>, bearer: &str) ->
        Result<RequestBuilder, EnricherError> {
        let url = self.endpoint_url(endpoint)?;
        Ok(self.http.get(url).bearer_auth(bearer))
    }
}

#[async_trait]
impl CatalogApi for SpotifyClient {
    async fn request_token(&self, client_id: &str, client_secret: &str) ->
        Result<ApiResponse, EnricherError> {
        let response = self.token_request(client_id, client_secret).send().await?;
        ApiResponse::from_reqwest(response).await
    }

    async fn get(&self, endpoint: Endpoint<'_>, bearer: &str) ->
        Result<ApiResponse, EnricherError> {
        let response = self.endpoint(endpoint, bearer)?.send().await?;
        ApiResponse::from_reqwest(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> SpotifyClient {
        let cfg = SpotifyConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            token_url: Url::parse(&format!("{}/api/token", server.url())).unwrap(),
            api_base: Url::parse(&format!("{}/v1/", server.url())).unwrap(),
        };
        SpotifyClient::new(&HttpConfig::default(), &cfg).unwrap()
    }

    fn live() -> bool {
        std::env::var("LIVE_HTTP").ok().as_deref() == Some("1")
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::Track("t1").path(), "tracks/t1");
        assert_eq!(Endpoint::Artist("a1").path(), "artists/a1");
        assert_eq!(Endpoint::AudioFeatures("t1").path(), "audio-features/t1");
    }

    #[test]
    fn retry_after_parses_seconds_only() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(" 10 "), Some(Duration::from_secs(10)));
        assert_eq!(parse_retry_after("soon"), None);
        assert_eq!(parse_retry_after("-1"), None);
    }

    #[tokio::test]
    async fn token_request_uses_basic_auth_and_form_body() -> Result<(), EnricherError> {
        let mut server = mockito::Server::new_async().await;
        // base64("id:secret")
        let mock = server.mock("POST", "/api/token")
            .match_header("authorization", "Basic aWQ6c2VjcmV0")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body("grant_type=client_credentials")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok","token_type":"Bearer","expires_in":3600}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client.request_token("id", "secret").await?;

        mock.assert_async().await;
        assert!(response.is_success());
        let payload: crate::types::TokenPayload = response.json()?;
        assert_eq!(payload.access_token.as_deref(), Some("tok"));
        Ok(())
    }

    #[tokio::test]
    async fn get_sends_bearer_and_reads_retry_after() -> Result<(), EnricherError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/v1/tracks/abc123")
            .match_header("authorization", "Bearer tok")
            .with_status(429)
            .with_header("retry-after", "3")
            .with_body("")
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client.get(Endpoint::Track("abc123"), "tok").await?;

        mock.assert_async().await;
        assert_eq!(response.status, 429);
        assert!(!response.is_success());
        assert_eq!(response.retry_after, Some(Duration::from_secs(3)));
        Ok(())
    }

    #[tokio::test]
    async fn get_hits_artist_and_feature_paths() -> Result<(), EnricherError> {
        let mut server = mockito::Server::new_async().await;
        let artist = server.mock("GET", "/v1/artists/a1")
            .with_status(200)
            .with_body(r#"{"genres":["rock"]}"#)
            .create_async()
            .await;
        let features = server.mock("GET", "/v1/audio-features/t1")
            .with_status(200)
            .with_body(r#"{"tempo":100.0}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let a = client.get(Endpoint::Artist("a1"), "tok").await?;
        let f = client.get(Endpoint::AudioFeatures("t1"), "tok").await?;

        artist.assert_async().await;
        features.assert_async().await;
        assert_eq!(a.retry_after, None);
        assert!(f.body.contains("tempo"));
        Ok(())
    }

    #[tokio::test]
    #[allow(dead_code)]
    async fn spotify_client_testbench() -> Result<(), EnricherError> {
        dotenvy::dotenv().ok();

        if !live() {
            eprintln!("Set LIVE_HTTP=1 to run");
            return Ok(())
        }

        let cfgs = crate::config::load_config()?;
        let spotify = SpotifyClient::new(&cfgs.http, &cfgs.spotify)?;

        let token = spotify.request_token(
            &cfgs.spotify.client_id, &cfgs.spotify.client_secret).await?;
        assert!(token.is_success());
        let token: crate::types::TokenPayload = token.json()?;
        let bearer = token.access_token.unwrap_or_default();

        // Breathe Deeper -  Tame Impala, Lil Yatchy
        let track = spotify.get(Endpoint::Track("6GtOsEzNUhJghrIf6UTbRV"), &bearer).await?;
        assert!(track.is_success());
        println!("track: {}", track.body);

        Ok(())
    }
}
