//! Ingestion-specific error types.

use crate::error::DatacubesError;
use thiserror::Error;

/// Errors that can occur while opening or loading a tabular source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Invalid spreadsheet URL: {0}")]
    InvalidSpreadsheetUrl(String),

    #[error("No spreadsheet API key configured")]
    MissingApiKey,

    #[error("Source {0} was loaded before it was opened")]
    NotOpened(String),

    #[error("Unsupported load configuration: {0}")]
    Unsupported(String),

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

impl From<SourceError> for DatacubesError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::InvalidSpreadsheetUrl(_) | SourceError::MissingApiKey => {
                DatacubesError::SourceConfiguration(err.to_string())
            }
            SourceError::Http(e) => DatacubesError::Http(e),
            SourceError::Csv(e) => DatacubesError::Csv(e),
            SourceError::Json(e) => DatacubesError::Json(e),
            SourceError::Io(e) => DatacubesError::Io(e),
            other => DatacubesError::Source(other.to_string()),
        }
    }
}
