use serde::{Deserialize, Serialize};

/// Base-62 track identifier, the last segment of `spotify:track:{id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub String);

impl TrackId {
    /// Takes everything after the final ':' (the whole string if there is none)
    pub fn from_uri(uri: &str) -> Option<TrackId> {
        let id = uri.trim().rsplit(':').next().unwrap_or_default().trim();
        if id.is_empty() {
            None
        } else {
            Some(TrackId(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtistId(pub String);


/// Row marker used to resume across runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedFlag {
    Yes,
    No
}

impl ProcessedFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessedFlag::Yes => "Yes",
            ProcessedFlag::No  => "No"
        }
    }

    /// Only an exact "Yes" counts as processed, anything else is retried
    pub fn parse(s: &str) -> ProcessedFlag {
        match s.trim() {
            "Yes" => ProcessedFlag::Yes,
            _ => ProcessedFlag::No
        }
    }
}


/// Bearer token from the client-credentials grant
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}


/// POST /api/token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPayload {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>
}

/// GET /v1/tracks/{id}, only the fields the enricher reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackPayload {
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: AlbumPayload,
    pub popularity: Option<u32>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumPayload {
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ImagePayload>>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagePayload {
    pub url: String
}

impl TrackPayload {
    pub fn primary_artist(&self) -> Option<ArtistId> {
        self.artists.first()
            .and_then(|a| a.id.as_deref())
            .filter(|id| !id.is_empty())
            .map(|id| ArtistId(id.to_string()))
    }

    /// Spotify lists album art largest first
    pub fn album_image_url(&self) -> Option<String> {
        self.album.images.as_ref()
            .and_then(|images| images.first())
            .map(|image| image.url.clone())
    }
}

/// GET /v1/artists/{id}
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistPayload {
    #[serde(default)]
    pub genres: Option<Vec<String>>
}

impl ArtistPayload {
    pub fn joined_genres(&self) -> String {
        self.genres.as_deref().unwrap_or_default().join(", ")
    }
}

/// GET /v1/audio-features/{id}, every field may be missing or null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub key: Option<i32>,
    pub tempo: Option<f64>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub mode: Option<i32>,      // 0 = minor, 1 = major
    pub loudness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub speechiness: Option<f64>
}


/// Everything fetched for one track, plus the token that is current
/// after any refresh during the fetch
#[derive(Debug, Clone)]
pub struct EnrichmentResult {
    pub genres: String,
    pub release_date: Option<String>,
    pub popularity: Option<u32>,
    pub album_image_url: Option<String>,
    pub features: AudioFeatures,
    pub token: AccessToken
}

#[derive(Debug, Clone)]
pub enum Enrichment {
    Found(EnrichmentResult),
    /// soft failure, the row stays unprocessed for the next run
    NotFound { token: AccessToken }
}
