//! Error handling for datacubes-rs
//!
//! This module defines the crate-wide error type and a Result alias for use
//! throughout the library. Component-specific failures (ingestion, render
//! requests) are absorbed locally by their owners and only logged; this type
//! is what those owners see before they decide how to degrade.

use thiserror::Error;

/// Main error type for datacubes-rs operations
#[derive(Error, Debug)]
pub enum DatacubesError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// A dataset source could not be configured (e.g. malformed spreadsheet URL)
    #[error("Source configuration error: {0}")]
    SourceConfiguration(String),

    /// A tabular source failed while opening or loading
    #[error("Source error: {0}")]
    Source(String),

    /// Errors from the external renderer
    #[error("Render error: {0}")]
    Render(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Delimited text parsing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DatacubesError>,
    },
}

impl DatacubesError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        DatacubesError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error originates from a misconfigured source rather than a
    /// transient transport failure.
    pub fn is_configuration(&self) -> bool {
        match self {
            DatacubesError::SourceConfiguration(_) | DatacubesError::Config(_) => true,
            DatacubesError::WithContext { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

/// Result type alias for datacubes-rs operations
pub type Result<T> = std::result::Result<T, DatacubesError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<DatacubesError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DatacubesError::Source("connection reset".to_string());
        assert_eq!(err.to_string(), "Source error: connection reset");
    }

    #[test]
    fn test_error_with_context() {
        let err = DatacubesError::Render("502".to_string());
        let with_ctx = err.with_context("High-quality render failed");
        assert!(with_ctx.to_string().contains("High-quality render failed"));
        assert!(with_ctx.to_string().contains("502"));
    }

    #[test]
    fn test_result_ext_on_io_error() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing.csv",
        ));
        let err = res.context("Failed to read dataset").unwrap_err();
        assert!(err.to_string().starts_with("Failed to read dataset"));
    }

    #[test]
    fn test_is_configuration_sees_through_context() {
        let err = DatacubesError::SourceConfiguration("no sheet id".into()).with_context("sheet");
        assert!(err.is_configuration());
        assert!(!DatacubesError::Source("x".into()).is_configuration());
    }
}
