//! JSON source: an array of flat objects, one object per row.
//!
//! Column order follows the first occurrence of each key. Nested values are
//! kept as their JSON text.

use super::column::{Column, ColumnHeader};
use super::delimited::fetch_text;
use super::error::{SourceError, SourceResult};
use super::source::{LoadConfig, LoadProgress, Location, TabularSource};
use super::table::RawTable;
use async_trait::async_trait;
use serde_json::Value;

/// Convert a JSON document into a raw table.
pub fn parse_json_rows(text: &str) -> SourceResult<RawTable> {
    let document: Value = serde_json::from_str(text)?;
    let Value::Array(rows) = document else {
        return Err(SourceError::Malformed(
            "expected a JSON array of objects".to_string(),
        ));
    };

    let mut headers: Vec<String> = Vec::new();
    for row in &rows {
        let Value::Object(map) = row else {
            return Err(SourceError::Malformed(format!(
                "expected an object per row, found {}",
                row
            )));
        };
        for key in map.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = rows
        .iter()
        .filter_map(Value::as_object)
        .map(|map| {
            headers
                .iter()
                .map(|h| map.get(h).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON source backed by a file or URL.
pub struct JsonSource {
    id: String,
    location: Location,
    client: reqwest::Client,
    chunk_rows: usize,
    table: Option<RawTable>,
}

impl JsonSource {
    pub fn new(location: Location, client: reqwest::Client, chunk_rows: usize) -> Self {
        Self {
            id: location.id(),
            location,
            client,
            chunk_rows,
            table: None,
        }
    }
}

#[async_trait]
impl TabularSource for JsonSource {
    fn source_id(&self) -> &str {
        &self.id
    }

    async fn open(&mut self) -> SourceResult<Vec<ColumnHeader>> {
        let text = fetch_text(&self.client, &self.location).await?;
        let table = parse_json_rows(&text)?;
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
            .ok_or_else(|| SourceError::NotOpened(self.id.clone()))?;
        table.build_columns(&config, self.chunk_rows, progress)
    }
}
