//! Tabular data ingestion.
//!
//! - [`column`] - immutable typed columns shared by reference
//! - [`source`] - the open/load contract every source implements
//! - [`delimited`], [`json`], [`spreadsheet`] - concrete sources
//! - [`DefaultSourceFactory`] - builds the right source for a [`SourceSpec`]

pub mod column;
pub mod delimited;
pub mod error;
pub mod json;
pub mod source;
pub mod spreadsheet;
pub mod table;

pub use column::{
    row_count, same_columns, Column, ColumnHeader, ColumnRange, ColumnRef, ColumnValues,
    DataType,
};
pub use delimited::DelimitedSource;
pub use error::{SourceError, SourceResult};
pub use json::JsonSource;
pub use source::{
    LoadConfig, LoadProgress, Location, SourceFactory, SourceKind, SourceSpec, TabularSource,
};
pub use spreadsheet::{extract_sheet_id, SpreadsheetSource};

use crate::config::AppConfig;
use crate::config::SpreadsheetConfig;
use crate::error::{DatacubesError, Result};

/// Factory for the built-in sources, sharing one HTTP client.
pub struct DefaultSourceFactory {
    client: reqwest::Client,
    spreadsheet: SpreadsheetConfig,
    chunk_rows: usize,
}

impl DefaultSourceFactory {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.ingestion.http_timeout())
            .build()
            .map_err(|e| DatacubesError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            spreadsheet: config.spreadsheet.clone(),
            chunk_rows: config.ingestion.progress_chunk_rows,
        })
    }
}

impl SourceFactory for DefaultSourceFactory {
    fn create(&self, spec: &SourceSpec) -> SourceResult<Box<dyn TabularSource>> {
        let client = self.client.clone();
        let source: Box<dyn TabularSource> = match spec {
            SourceSpec::Delimited {
                location,
                delimiter,
                includes_header,
            } => Box::new(DelimitedSource::new(
                location.clone(),
                delimiter.clone(),
                *includes_header,
                client,
                self.chunk_rows,
            )),
            SourceSpec::Json { location } => {
                Box::new(JsonSource::new(location.clone(), client, self.chunk_rows))
            }
            SourceSpec::Spreadsheet { sheet_id } => {
                let api_key = self
                    .spreadsheet
                    .resolve_api_key()
                    .ok_or(SourceError::MissingApiKey)?;
                Box::new(SpreadsheetSource::new(
                    sheet_id.clone(),
                    api_key,
                    self.spreadsheet.api_base.clone(),
                    client,
                    self.chunk_rows,
                ))
            }
        };
        Ok(source)
    }
}
