//! Spreadsheet source backed by the Google Sheets values API.
//!
//! The sheet id is taken from a sharing URL of the form
//! `https://docs.google.com/spreadsheets/d/<id>/edit`. The first row is the
//! header row.

use super::column::{Column, ColumnHeader};
use super::error::{SourceError, SourceResult};
use super::source::{LoadConfig, LoadProgress, TabularSource};
use super::table::RawTable;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Range requested from the first sheet.
const SHEET_RANGE: &str = "A:ZZ";

fn sheet_url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"docs\.google\.com/spreadsheets/d/([^/]+)/").ok())
        .as_ref()
}

/// Extract the sheet id from a sharing URL.
pub fn extract_sheet_id(uri: &str) -> Option<String> {
    sheet_url_pattern()?
        .captures(uri)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Source reading the first sheet of a spreadsheet.
pub struct SpreadsheetSource {
    sheet_id: String,
    api_key: String,
    api_base: String,
    client: reqwest::Client,
    chunk_rows: usize,
    table: Option<RawTable>,
}

impl SpreadsheetSource {
    pub fn new(
        sheet_id: impl Into<String>,
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        client: reqwest::Client,
        chunk_rows: usize,
    ) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            api_key: api_key.into(),
            api_base: api_base.into(),
            client,
            chunk_rows,
            table: None,
        }
    }

    fn values_url(&self) -> String {
        format!(
            "{}/{}/values/{}",
            self.api_base.trim_end_matches('/'),
            self.sheet_id,
            SHEET_RANGE
        )
    }
}

/// Convert the values API payload into a raw table.
fn table_from_values(values: Vec<Vec<serde_json::Value>>) -> RawTable {
    let records = values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect();
    RawTable::from_records(records, true)
}

#[async_trait]
impl TabularSource for SpreadsheetSource {
    fn source_id(&self) -> &str {
        &self.sheet_id
    }

    async fn open(&mut self) -> SourceResult<Vec<ColumnHeader>> {
        let url = self.values_url();
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let range: ValueRange = response.json().await?;
        let table = table_from_values(range.values);
        let headers = table.infer_headers();
        self.table = Some(table);
        Ok(headers)
    }

    async fn load(
        &mut self,
        config: LoadConfig,
        progress: &mut (dyn FnMut(LoadProgress) + Send),
    ) -> SourceResult<Vec<Column>> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| SourceError::NotOpened(self.sheet_id.clone()))?;
        table.build_columns(&config, self.chunk_rows, progress)
    }
}
