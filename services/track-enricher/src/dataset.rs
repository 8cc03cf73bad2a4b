//!
//! src/dataset.rs  Oct 16th, 2026
//!
//! The csv being enriched, held fully in memory. Every successful row
//! rewrites the whole file through a temp file in the same directory
//! which is then persisted over the original
//!

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::EnricherError;
use crate::types::{EnrichmentResult, ProcessedFlag, TrackId};

pub const TRACK_ID_COLUMN: &str = "TrackID";
pub const PROCESSED_COLUMN: &str = "Processed";

pub const GENRE: &str = "Genre";
pub const RELEASE_DATE: &str = "ReleaseDate";
pub const POPULARITY: &str = "Popularity";
pub const ALBUM_IMAGE_URL: &str = "AlbumImageURL";
pub const KEY: &str = "Key";
pub const TEMPO: &str = "Tempo";
pub const DANCEABILITY: &str = "Danceability";
pub const ENERGY: &str = "Energy";
pub const MODE: &str = "Mode";
pub const LOUDNESS: &str = "Loudness";
pub const INSTRUMENTALNESS: &str = "Instrumentalness";
pub const SPEECHINESS: &str = "Speechiness";

pub const ENRICHMENT_COLUMNS: [&str; 12] = [
    GENRE, RELEASE_DATE, POPULARITY, ALBUM_IMAGE_URL, KEY, TEMPO,
    DANCEABILITY, ENERGY, MODE, LOUDNESS, INSTRUMENTALNESS, SPEECHINESS
];

/// Absent values are written as empty cells
fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>
}

impl Dataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EnricherError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| EnricherError::Dataset(format!("open {}: {e}", path.display())))?;

        let headers: Vec<String> = reader.headers()?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let mut row: Vec<String> = record?.iter().map(str::to_string).collect();
            // extra cells have no column to live in and would be lost on save
            if row.len() > headers.len() {
                return Err(EnricherError::Dataset(format!(
                    "{} row {}: expected {} fields, saw {}",
                    path.display(), index + 1, headers.len(), row.len()
                )));
            }
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        debug!(path = %path.display(), rows = rows.len(), "dataset.load");
        Ok( Self { path, headers, rows } )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Appends the column (empty in every row) if it is not there yet
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column(name) {
            return index;
        }
        self.headers.push(name.to_string());
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width.max(row.len()), String::new());
        }
        width - 1
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column(name)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    fn set(&mut self, row: usize, name: &str, value: String) {
        let col = self.ensure_column(name);
        if let Some(cells) = self.rows.get_mut(row) {
            cells[col] = value;
        }
    }

    ///
    /// Derives TrackID from the uri column, adds the enrichment columns
    /// and defaults every missing Processed cell to No
    ///
    pub fn prepare(&mut self, uri_column: &str) -> Result<(), EnricherError> {
        let uri = self.column(uri_column).ok_or_else(|| EnricherError::Dataset(
            format!("{} has no column {uri_column:?}", self.path.display())
        ))?;

        let track_id = self.ensure_column(TRACK_ID_COLUMN);
        let processed = self.ensure_column(PROCESSED_COLUMN);
        for name in ENRICHMENT_COLUMNS {
            self.ensure_column(name);
        }

        for row in &mut self.rows {
            row[track_id] = TrackId::from_uri(&row[uri])
                .map(|id| id.0)
                .unwrap_or_default();
            row[processed] = ProcessedFlag::parse(&row[processed]).as_str().to_string();
        }
        Ok(())
    }

    pub fn track_id(&self, row: usize) -> Option<TrackId> {
        self.get(row, TRACK_ID_COLUMN).and_then(TrackId::from_uri)
    }

    pub fn processed(&self, row: usize) -> ProcessedFlag {
        self.get(row, PROCESSED_COLUMN)
            .map(ProcessedFlag::parse)
            .unwrap_or(ProcessedFlag::No)
    }

    /// Writes every enrichment field into the row and marks it processed
    pub fn apply(&mut self, row: usize, result: &EnrichmentResult) {
        let features = &result.features;
        self.set(row, GENRE, result.genres.clone());
        self.set(row, RELEASE_DATE, cell(result.release_date.as_deref()));
        self.set(row, POPULARITY, cell(result.popularity));
        self.set(row, ALBUM_IMAGE_URL, cell(result.album_image_url.as_deref()));
        self.set(row, KEY, cell(features.key));
        self.set(row, TEMPO, cell(features.tempo));
        self.set(row, DANCEABILITY, cell(features.danceability));
        self.set(row, ENERGY, cell(features.energy));
        self.set(row, MODE, cell(features.mode));
        self.set(row, LOUDNESS, cell(features.loudness));
        self.set(row, INSTRUMENTALNESS, cell(features.instrumentalness));
        self.set(row, SPEECHINESS, cell(features.speechiness));
        self.set(row, PROCESSED_COLUMN, ProcessedFlag::Yes.as_str().to_string());
    }

    ///
    /// Rewrites the whole file, all columns and rows. A symlinked path is
    /// written through to its target, and the target keeps its permissions
    ///
    pub fn save(&self) -> Result<(), EnricherError> {
        let target = std::fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from(".")
        };

        let temp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| EnricherError::Dataset(
                format!("tempfile in {}: {e}", parent.display())
            ))?;

        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(temp.as_file());
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        if let Ok(meta) = std::fs::metadata(&target) {
            temp.as_file().set_permissions(meta.permissions())?;
        }

        temp.persist(&target).map_err(|e| EnricherError::Dataset(
            format!("persist {}: {e}", target.display())
        ))?;

        debug!(path = %self.path.display(), rows = self.rows.len(), "dataset.save");
        Ok(())
    }
}
