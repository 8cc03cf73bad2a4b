//!
//! src/testing.rs  Oct 16th, 2026
//!
//! Scripted in-memory catalog used by the unit tests. Responses are
//! queued per path, the last one queued for a path repeats forever
//!

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::errors::EnricherError;
use crate::fetch::{ApiResponse, CatalogApi, Endpoint};

const TOKEN_KEY: &str = "token";

#[derive(Debug, Clone)]
pub enum Scripted {
    Response(ApiResponse),
    Transport(String)
}

pub fn ok(body: &str) -> Scripted {
    Scripted::Response(ApiResponse { status: 200, retry_after: None, body: body.to_string() })
}

pub fn status(code: u16) -> Scripted {
    Scripted::Response(ApiResponse { status: code, retry_after: None, body: String::new() })
}

pub fn rate_limited(retry_after_secs: Option<u64>) -> Scripted {
    Scripted::Response(ApiResponse {
        status: 429,
        retry_after: retry_after_secs.map(Duration::from_secs),
        body: String::new()
    })
}

pub fn track_body(artist_id: &str) -> String {
    format!(r#"{{
        "id": "ignored",
        "artists": [{{"id": "{artist_id}", "name": "Tame Impala"}}],
        "album": {{
            "release_date": "2020-02-14",
            "images": [{{"url": "https://i.scdn.co/image/640", "height": 640, "width": 640}}]
        }},
        "popularity": 67
    }}"#)
}

pub const ARTIST_BODY: &str = r#"{"genres": ["australian psych", "neo-psychedelia"]}"#;

pub const FEATURES_BODY: &str = r#"{
    "key": 9, "tempo": 120.005, "danceability": 0.61, "energy": 0.72, "mode": 1,
    "loudness": -6.3, "instrumentalness": 0.0012, "speechiness": 0.04
}"#;

#[derive(Debug, Clone)]
pub struct Call {
    pub key: String,
    pub bearer: Option<String>,
    pub at: Instant
}

#[derive(Default)]
pub struct FakeCatalog {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<Call>>
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, key: &str, scripted: Scripted) {
        self.scripts.lock().unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(scripted);
    }

    pub fn push_token(&self, scripted: Scripted) {
        self.push(TOKEN_KEY, scripted);
    }

    pub fn push_token_transport_error(&self, msg: &str) {
        self.push(TOKEN_KEY, Scripted::Transport(msg.to_string()));
    }

    /// Queues a full successful track, artist and audio-features exchange
    pub fn push_happy_track(&self, track_id: &str, artist_id: &str) {
        self.push(&format!("tracks/{track_id}"), ok(&track_body(artist_id)));
        self.push(&format!("artists/{artist_id}"), ok(ARTIST_BODY));
        self.push(&format!("audio-features/{track_id}"), ok(FEATURES_BODY));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, key: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.key == key).count()
    }

    pub fn token_calls(&self) -> usize {
        self.calls_to(TOKEN_KEY)
    }

    pub fn get_calls(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.key != TOKEN_KEY).count()
    }

    fn next(&self, key: &str, bearer: Option<&str>) -> Result<ApiResponse, EnricherError> {
        self.calls.lock().unwrap().push(Call {
            key: key.to_string(),
            bearer: bearer.map(str::to_string),
            at: Instant::now()
        });

        let mut scripts = self.scripts.lock().unwrap();
        let scripted = match scripts.get_mut(key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None
        };

        match scripted {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Transport(msg)) => Err(EnricherError::Http(msg)),
            None => Ok(ApiResponse { status: 404, retry_after: None, body: String::new() })
        }
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn request_token(&self, _client_id: &str, _client_secret: &str) ->
        Result<ApiResponse, EnricherError> {
        self.next(TOKEN_KEY, None)
    }

    async fn get(&self, endpoint: Endpoint<'_>, bearer: &str) ->
        Result<ApiResponse, EnricherError> {
        self.next(&endpoint.path(), Some(bearer))
    }
}
