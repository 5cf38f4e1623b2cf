//! Tabular source contract.
//!
//! A source is opened once to learn its column headers, then loaded with the
//! column types to materialize. Loading reports progress and always ends with
//! [`LoadProgress::Done`] on success.

use super::column::{Column, ColumnHeader, DataType};
use super::error::SourceResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of source a dataset node reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    #[default]
    None,
    Csv,
    Json,
    Spreadsheet,
}

impl SourceKind {
    pub fn display_name(&self) -> Option<&'static str> {
        match self {
            SourceKind::Csv => Some("CSV"),
            SourceKind::Json => Some("JSON"),
            SourceKind::Spreadsheet => Some("Google Sheets"),
            SourceKind::None => None,
        }
    }

    /// Map a local file to a source kind by its extension.
    pub fn from_path(path: &Path) -> Option<SourceKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(SourceKind::Csv),
            "json" => Some(SourceKind::Json),
            _ => None,
        }
    }
}

/// Where a flat file comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    File(PathBuf),
    Url(String),
}

impl Location {
    pub fn id(&self) -> String {
        match self {
            Location::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Location::Url(url) => url.clone(),
        }
    }
}

/// Everything needed to run one ingestion. Two equal specs describe the same
/// ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceSpec {
    Delimited {
        location: Location,
        delimiter: Option<String>,
        includes_header: bool,
    },
    Json {
        location: Location,
    },
    Spreadsheet {
        sheet_id: String,
    },
}

impl SourceSpec {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceSpec::Delimited { .. } => SourceKind::Csv,
            SourceSpec::Json { .. } => SourceKind::Json,
            SourceSpec::Spreadsheet { .. } => SourceKind::Spreadsheet,
        }
    }
}

/// Which columns to materialize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadConfig {
    pub columns: Vec<DataType>,
    pub generated_columns: Vec<ColumnHeader>,
}

impl LoadConfig {
    pub fn from_headers(headers: &[ColumnHeader]) -> Self {
        Self {
            columns: headers.iter().map(|h| h.data_type).collect(),
            generated_columns: Vec::new(),
        }
    }
}

/// Progress events emitted while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadProgress {
    Rows { loaded: usize, total: usize },
    Done,
}

/// A tabular data source.
#[async_trait]
pub trait TabularSource: Send {
    /// Identifier used in logs (file name, URL or sheet id).
    fn source_id(&self) -> &str;

    /// Fetch the source and return its column headers.
    async fn open(&mut self) -> SourceResult<Vec<ColumnHeader>>;

    /// Build the columns; `progress` receives `Done` once they are complete.
    async fn load(
        &mut self,
        config: LoadConfig,
        progress: &mut (dyn FnMut(LoadProgress) + Send),
    ) -> SourceResult<Vec<Column>>;
}

/// Creates sources for ingestion specs.
pub trait SourceFactory: Send + Sync {
    fn create(&self, spec: &SourceSpec) -> SourceResult<Box<dyn TabularSource>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_from_path() {
        assert_eq!(SourceKind::from_path(Path::new("a/b.CSV")), Some(SourceKind::Csv));
        assert_eq!(SourceKind::from_path(Path::new("x.json")), Some(SourceKind::Json));
        assert_eq!(SourceKind::from_path(Path::new("x.xlsx")), None);
        assert_eq!(SourceKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_location_id_uses_file_name() {
        let loc = Location::File(PathBuf::from("/data/cities.csv"));
        assert_eq!(loc.id(), "cities.csv");
    }
}
