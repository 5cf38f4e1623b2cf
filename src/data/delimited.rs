//! Delimited text (CSV/TSV) source.
//!
//! Reads a local file or a remote URL, parses it with the `csv` crate and
//! infers column types. When no delimiter is configured it is sniffed from
//! the first line.

use super::column::{Column, ColumnHeader};
use super::error::{SourceError, SourceResult};
use super::source::{LoadConfig, LoadProgress, Location, TabularSource};
use super::table::RawTable;
use async_trait::async_trait;

/// Delimiters considered when sniffing.
const CANDIDATE_DELIMITERS: &[u8] = b",;\t|";

/// Fetch the text behind a location.
pub(crate) async fn fetch_text(client: &reqwest::Client, location: &Location) -> SourceResult<String> {
    match location {
        Location::File(path) => Ok(tokio::fs::read_to_string(path).await?),
        Location::Url(url) => {
            let response = client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status {
                    status: status.as_u16(),
                    url: url.clone(),
                });
            }
            Ok(response.text().await?)
        }
    }
}

/// Resolve a user supplied delimiter, sniffing `sample` when none is given.
pub fn resolve_delimiter(delimiter: Option<&str>, sample: &str) -> u8 {
    match delimiter.map(|d| d.trim_end_matches(&['\r', '\n'][..])) {
        Some("\\t") | Some("tab") | Some("\t") => b'\t',
        Some(d) if d.len() == 1 => d.as_bytes()[0],
        _ => sniff_delimiter(sample),
    }
}

fn sniff_delimiter(sample: &str) -> u8 {
    let first_line = sample.lines().next().unwrap_or("");
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .map(|d| (d, first_line.bytes().filter(|b| *b == d).count()))
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count > 0)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// Parse delimited text into a raw table.
pub fn parse_delimited(text: &str, delimiter: u8, includes_header: bool) -> SourceResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable::from_records(records, includes_header))
}

/// CSV/TSV source backed by a file or URL.
pub struct DelimitedSource {
    id: String,
    location: Location,
    delimiter: Option<String>,
    includes_header: bool,
    client: reqwest::Client,
    chunk_rows: usize,
    table: Option<RawTable>,
}

impl DelimitedSource {
    pub fn new(
        location: Location,
        delimiter: Option<String>,
        includes_header: bool,
        client: reqwest::Client,
        chunk_rows: usize,
    ) -> Self {
        Self {
            id: location.id(),
            location,
            delimiter,
            includes_header,
            client,
            chunk_rows,
            table: None,
        }
    }
}

#[async_trait]
impl TabularSource for DelimitedSource {
    fn source_id(&self) -> &str {
        &self.id
    }

    async fn open(&mut self) -> SourceResult<Vec<ColumnHeader>> {
        let text = fetch_text(&self.client, &self.location).await?;
        let delimiter = resolve_delimiter(self.delimiter.as_deref(), &text);
        tracing::debug!(
            "Parsing {} with delimiter {:?}",
            self.id,
            delimiter as char
        );
        let table = parse_delimited(&text, delimiter, self.includes_header)?;
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
