//!
//! src/errors.rs  Oct 16th, 2026 
//!
//! Defines the error enum for the enricher and how each variant 
//! is treated by the batch driver (skip the row or abort the run) 
//!
//!

use thiserror::Error; 

#[derive(Error, Debug)]
pub enum EnricherError {
    #[error("config error: {0}")]
    Config(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("retries exhausted for {endpoint} after {attempts} attempts")]
    RetryExhausted { endpoint: String, attempts: u8 },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("dataset error: {0}")]
    Dataset(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl EnricherError {
    /// Soft errors leave the row unprocessed and let the batch continue.
    /// Everything else aborts the run. 
    pub fn is_soft(&self) -> bool {
        matches!(
            self, 
            EnricherError::Http(_) 
                | EnricherError::Status { .. } 
                | EnricherError::RetryExhausted { .. }
                | EnricherError::Parse(_)
        )
    }
}

impl From<reqwest::Error> for EnricherError {
    fn from(e: reqwest::Error) -> Self { EnricherError::Http(e.to_string()) }
}

impl From<serde_json::Error> for EnricherError {
    fn from(e: serde_json::Error) -> Self { EnricherError::Parse(e.to_string()) }
}

impl From<csv::Error> for EnricherError {
    fn from(e: csv::Error) -> Self { EnricherError::Dataset(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_are_soft() {
        assert!(EnricherError::Http("connection reset".into()).is_soft());
        assert!(EnricherError::Status { status: 404, endpoint: "tracks".into() }.is_soft());
        assert!(EnricherError::RetryExhausted { endpoint: "artists".into(), attempts: 4 }
            .is_soft());
        assert!(EnricherError::Parse("missing field".into()).is_soft());
    }

    #[test]
    fn auth_and_storage_failures_abort() {
        assert!(!EnricherError::Auth("no token".into()).is_soft());
        assert!(!EnricherError::Dataset("bad header".into()).is_soft());
        assert!(!EnricherError::Config("unset".into()).is_soft());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(!EnricherError::from(io).is_soft());
    }
}
