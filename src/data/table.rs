//! Raw text tables and column type inference.
//!
//! Every source first fetches its content as rows of text cells. Headers and
//! types are inferred from those cells when the source is opened; typed
//! columns are built when it is loaded.

use super::column::{Column, ColumnHeader, DataType};
use super::error::{SourceError, SourceResult};
use super::source::{LoadConfig, LoadProgress};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Date-time layouts tried after RFC 3339.
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M"];

/// Date-only layouts.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Parse a cell as a date, accepting the layouts commonly found in exports.
pub fn parse_date(cell: &str) -> Option<NaiveDateTime> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Some(dt.naive_utc());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cell, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(cell, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a cell as a number; empty cells are missing values.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    match cell {
        "true" | "TRUE" => Some(1.0),
        "false" | "FALSE" => Some(0.0),
        _ => cell.parse::<f64>().ok(),
    }
}

/// Infer the type of a column from its cells.
///
/// Numbers win over dates so that plain years stay numeric. Missing cells are
/// tolerated in number columns only; a column without any value is text.
pub fn infer_type<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> DataType {
    let mut non_empty = cells.clone().map(str::trim).filter(|c| !c.is_empty()).peekable();
    if non_empty.peek().is_none() {
        return DataType::String;
    }
    if non_empty.all(|c| parse_number(c).is_some()) {
        return DataType::Number;
    }
    if cells.clone().all(|c| parse_date(c).is_some()) {
        return DataType::Date;
    }
    DataType::String
}

/// Rows of text cells with their header names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table from records; the first one is the header row if
    /// `includes_header` is set, otherwise columns are named `Column 1..n`.
    pub fn from_records(mut records: Vec<Vec<String>>, includes_header: bool) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let headers = if includes_header {
            records.remove(0)
        } else {
            let width = records.iter().map(Vec::len).max().unwrap_or(0);
            (1..=width).map(|i| format!("Column {}", i)).collect()
        };
        Self {
            headers,
            rows: records,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map(String::as_str).unwrap_or("")
    }

    fn cells(&self, column: usize) -> impl Iterator<Item = &str> + Clone {
        self.rows
            .iter()
            .map(move |row| row.get(column).map(String::as_str).unwrap_or(""))
    }

    /// Headers with inferred types, in column order.
    pub fn infer_headers(&self) -> Vec<ColumnHeader> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, name)| ColumnHeader::new(name.trim(), infer_type(self.cells(i))))
            .collect()
    }

    /// Build typed columns, reporting progress every `chunk_rows` rows and a
    /// final `Done`.
    pub fn build_columns(
        &self,
        config: &LoadConfig,
        chunk_rows: usize,
        progress: &mut (dyn FnMut(LoadProgress) + Send),
    ) -> SourceResult<Vec<Column>> {
        if !config.generated_columns.is_empty() {
            return Err(SourceError::Unsupported(format!(
                "{} generated column(s)",
                config.generated_columns.len()
            )));
        }
        if config.columns.len() > self.headers.len() {
            return Err(SourceError::Malformed(format!(
                "requested {} columns but the source has {}",
                config.columns.len(),
                self.headers.len()
            )));
        }

        let total = self.row_count();
        let chunk_rows = chunk_rows.max(1);
        let mut builders: Vec<ColumnBuilder> = config
            .columns
            .iter()
            .map(|t| ColumnBuilder::new(*t, total))
            .collect();

        for row in 0..total {
            for (col, builder) in builders.iter_mut().enumerate() {
                builder.push(self.cell(row, col)).map_err(|cell| {
                    SourceError::Malformed(format!(
                        "row {}, column '{}': cannot read {:?} as {}",
                        row + 1,
                        self.headers[col],
                        cell,
                        builder.data_type().display_name()
                    ))
                })?;
            }
            if (row + 1) % chunk_rows == 0 {
                progress(LoadProgress::Rows {
                    loaded: row + 1,
                    total,
                });
            }
        }

        let columns = builders
            .into_iter()
            .zip(self.headers.iter())
            .map(|(builder, name)| builder.finish(name.trim()))
            .collect();
        progress(LoadProgress::Done);
        Ok(columns)
    }
}

enum ColumnBuilder {
    String(Vec<String>),
    Number(Vec<f64>),
    Date(Vec<NaiveDateTime>),
}

impl ColumnBuilder {
    fn new(data_type: DataType, capacity: usize) -> Self {
        match data_type {
            DataType::String => ColumnBuilder::String(Vec::with_capacity(capacity)),
            DataType::Number => ColumnBuilder::Number(Vec::with_capacity(capacity)),
            DataType::Date => ColumnBuilder::Date(Vec::with_capacity(capacity)),
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            ColumnBuilder::String(_) => DataType::String,
            ColumnBuilder::Number(_) => DataType::Number,
            ColumnBuilder::Date(_) => DataType::Date,
        }
    }

    fn push<'a>(&mut self, cell: &'a str) -> Result<(), &'a str> {
        match self {
            ColumnBuilder::String(v) => v.push(cell.to_string()),
            ColumnBuilder::Number(v) => {
                if cell.trim().is_empty() {
                    v.push(f64::NAN);
                } else {
                    v.push(parse_number(cell).ok_or(cell)?);
                }
            }
            ColumnBuilder::Date(v) => v.push(parse_date(cell).ok_or(cell)?),
        }
        Ok(())
    }

    fn finish(self, name: &str) -> Column {
        match self {
            ColumnBuilder::String(v) => Column::string(name, v),
            ColumnBuilder::Number(v) => Column::number(name, v),
            ColumnBuilder::Date(v) => Column::date(name, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_infer_types() {
        assert_eq!(infer_type(["1", "2.5", ""].into_iter()), DataType::Number);
        assert_eq!(infer_type(["2020", "2021"].into_iter()), DataType::Number);
        assert_eq!(
            infer_type(["2020-01-01", "2021-03-04T10:00:00Z"].into_iter()),
            DataType::Date
        );
        assert_eq!(infer_type(["2020-01-01", ""].into_iter()), DataType::String);
        assert_eq!(infer_type(["a", "1"].into_iter()), DataType::String);
        assert_eq!(infer_type(["", ""].into_iter()), DataType::String);
    }

    #[test]
    fn test_headers_follow_column_order() {
        let table = RawTable::from_records(
            records(&[&["name", "age", "born"], &["ann", "31", "1990-02-01"]]),
            true,
        );
        let headers = table.infer_headers();
        assert_eq!(
            headers,
            vec![
                ColumnHeader::new("name", DataType::String),
                ColumnHeader::new("age", DataType::Number),
                ColumnHeader::new("born", DataType::Date),
            ]
        );
    }

    #[test]
    fn test_without_header_generates_names() {
        let table = RawTable::from_records(records(&[&["1", "2"], &["3", "4"]]), false);
        assert_eq!(table.headers, vec!["Column 1", "Column 2"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_build_columns_reports_progress_then_done() {
        let mut rows = vec![vec!["v".to_string()]];
        rows.extend((0..10).map(|i| vec![i.to_string()]));
        let table = RawTable::from_records(rows, true);
        let config = LoadConfig::from_headers(&table.infer_headers());

        let mut events = Vec::new();
        let columns = table
            .build_columns(&config, 4, &mut |p| events.push(p))
            .unwrap();

        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].len(), 10);
        assert_eq!(
            events,
            vec![
                LoadProgress::Rows { loaded: 4, total: 10 },
                LoadProgress::Rows { loaded: 8, total: 10 },
                LoadProgress::Done,
            ]
        );
    }

    #[test]
    fn test_build_columns_rejects_generated_columns() {
        let table = RawTable::from_records(records(&[&["a"], &["1"]]), true);
        let mut config = LoadConfig::from_headers(&table.infer_headers());
        config
            .generated_columns
            .push(ColumnHeader::new("extra", DataType::Number));
        let err = table.build_columns(&config, 10, &mut |_| {}).unwrap_err();
        assert!(matches!(err, SourceError::Unsupported(_)));
    }

    #[test]
    fn test_build_columns_reports_bad_cell() {
        let table = RawTable::from_records(records(&[&["a"], &["x"]]), true);
        let config = LoadConfig {
            columns: vec![DataType::Date],
            generated_columns: Vec::new(),
        };
        let err = table.build_columns(&config, 10, &mut |_| {}).unwrap_err();
        assert!(err.to_string().contains("column 'a'"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = RawTable::from_records(records(&[&["a", "b"], &["1"], &["2", "3"]]), true);
        let config = LoadConfig::from_headers(&table.infer_headers());
        let columns = table.build_columns(&config, 10, &mut |_| {}).unwrap();
        assert_eq!(columns[1].len(), 2);
    }
}
