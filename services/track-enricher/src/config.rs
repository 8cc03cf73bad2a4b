//!
//! src/config.rs  Oct 16th, 2026
//!
//! Builds the single AppConfig value at startup from the environment
//! (and .env via dotenvy). Nothing here is global, the config is
//! handed down to the clients and the batch driver by reference
//!

use std::{path::PathBuf, str::FromStr, time};
use url::Url;
use crate::errors::EnricherError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 4;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// Constants for retry and pacing
pub const RETRY_MAX_ATTEMPTS: u8 = 4;
pub const RETRY_BASE_BACKOFF: u64 = 500;
pub const RETRY_JITTER: bool = true;
pub const RETRY_AFTER_DEFAULT: u64 = 5;
pub const RETRY_AFTER_MAX: u64 = 120;
pub const PACING_MS: u64 = 2000;

pub const DEFAULT_CSV_PATH: &str = "spotifypersonal.csv";
pub const DEFAULT_URI_COLUMN: &str = "Spotify Track Url";

/// Lookup used to read variables, std::env in production and a map in tests
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Returns the first non-empty value among the given names
fn env_check(env: EnvLookup, names: &[&str]) -> Result<String, EnricherError> {
    names.iter()
        .filter_map(|name| env(name))
        .find(|v| !v.trim().is_empty())
        .ok_or_else(|| EnricherError::Config(format!("{} was not set", names[0])))
}

/// Parses an optional variable, falling back to default when unset or invalid
fn env_or<T: FromStr>(env: EnvLookup, name: &str, default: T) -> T {
    env(name)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

/// Url::join drops the last segment unless the base ends in '/'
fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

/// Configuration that Spotify expects when hitting endpoints
#[derive(Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: Url,
    pub api_base: Url,
}

// secrets stay out of the startup log
impl std::fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &"<redacted>")
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url.as_str())
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

fn build_spotify(env: EnvLookup) -> Result<SpotifyConfig, EnricherError> {
    let client_id     = env_check(env, &["SPOTIFY_CLIENT_ID", "CLIENT_ID"])?;
    let client_secret = env_check(env, &["SPOTIFY_CLIENT_SECRET", "CLIENT_SECRET"])?;

    // form urls
    let token_url = env("SPOTIFY_TOKEN_URL")
        .unwrap_or_else(|| "https://accounts.spotify.com/api/token".to_string());

    let api_base  = env("SPOTIFY_API_BASE")
        .unwrap_or_else(|| "https://api.spotify.com/v1/".to_string());

    let token_url = Url::parse(&token_url)
        .map_err(|e| EnricherError::Config(format!("SPOTIFY_TOKEN_URL invalid {e}")))?;

    let mut api_base  = Url::parse(&api_base)
        .map_err(|e| EnricherError::Config(format!("SPOTIFY_API_BASE invalid {e}")))?;

    // ensure valid https and hostname for both urls
    ensure_https(&token_url).map_err(EnricherError::Config)?;
    ensure_https(&api_base).map_err(EnricherError::Config)?;
    ensure_host(&token_url, "accounts.spotify.com").map_err(EnricherError::Config)?;
    ensure_host(&api_base, "api.spotify.com").map_err(EnricherError::Config)?;

    ensure_trailing_slash(&mut api_base);

    Ok( SpotifyConfig { client_id, client_secret, token_url, api_base })
}

///
/// Configuration for Http timeouts, retries, etc.
///
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u8,
    pub base_backoff: time::Duration,
    pub jitter: bool,
    pub default_retry_after: time::Duration,
    pub max_retry_after: time::Duration
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_backoff: time::Duration::from_millis(RETRY_BASE_BACKOFF),
            jitter: RETRY_JITTER,
            default_retry_after: time::Duration::from_secs(RETRY_AFTER_DEFAULT),
            max_retry_after: time::Duration::from_secs(RETRY_AFTER_MAX)
        }
    }
}

fn build_retry(env: EnvLookup) -> RetryConfig {
    let max_attempts = env_or(env, "ENRICH_MAX_ATTEMPTS", RETRY_MAX_ATTEMPTS).max(1);
    let backoff_ms   = env_or(env, "ENRICH_BACKOFF_MS", RETRY_BASE_BACKOFF);
    let default_secs = env_or(env, "ENRICH_DEFAULT_RETRY_AFTER_SECS", RETRY_AFTER_DEFAULT);
    let max_secs     = env_or(env, "ENRICH_MAX_RETRY_AFTER_SECS", RETRY_AFTER_MAX);

    RetryConfig {
        max_attempts,
        base_backoff: time::Duration::from_millis(backoff_ms),
        default_retry_after: time::Duration::from_secs(default_secs),
        max_retry_after: time::Duration::from_secs(max_secs.max(default_secs)),
        ..RetryConfig::default()
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

///
/// Configuration for the csv that is enriched in place
///
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub uri_column: String
}

fn build_dataset(env: EnvLookup, path_arg: Option<String>) -> DatasetConfig {
    let path = path_arg
        .filter(|p| !p.trim().is_empty())
        .or_else(|| env("ENRICH_CSV_PATH"))
        .unwrap_or_else(|| DEFAULT_CSV_PATH.to_string());
    let uri_column = env("ENRICH_URI_COLUMN")
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_URI_COLUMN.to_string());

    DatasetConfig { path: PathBuf::from(path), uri_column }
}

#[derive(Debug, Clone)]
pub struct PacingConfig {
    pub between_rows: time::Duration
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

impl FromStr for LogFormat {
    type Err = EnricherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json"   => Ok(LogFormat::Json),
            other    => Err(EnricherError::Config(format!("unknown LOG_FORMAT {other}")))
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,track_enricher=debug,reqwest=warn".to_string(),
            format: LogFormat::Json,
            with_ansi: true,
            include_file_line: true,
            include_target: true,
        }
    }
}

fn build_logging(env: EnvLookup) -> Result<LoggingConfig, EnricherError> {
    let mut logging = LoggingConfig::default();
    if let Some(format) = env("LOG_FORMAT") {
        logging.format = format.parse()?;
    }
    Ok(logging)
}

///
/// AppConfig which holds everything the clients and driver need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spotify: SpotifyConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub dataset: DatasetConfig,
    pub pacing: PacingConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
/// The first positional argument, if any, overrides the csv path.
///
pub fn load_config() -> Result<AppConfig, EnricherError> {
    dotenvy::dotenv().ok();
    let env = |name: &str| std::env::var(name).ok();
    load_config_from(&env, std::env::args().nth(1))
}

pub fn load_config_from(env: EnvLookup, path_arg: Option<String>) ->
    Result<AppConfig, EnricherError> {
    let spotify = build_spotify(env)?;
    let http    = HttpConfig::default();
    let retry   = build_retry(env);
    let dataset = build_dataset(env, path_arg);
    let pacing  = PacingConfig {
        between_rows: time::Duration::from_millis(env_or(env, "ENRICH_PACING_MS", PACING_MS))
    };
    let logging = build_logging(env)?;

    Ok( AppConfig { spotify, http, retry, dataset, pacing, logging } )
}
