//! Column-oriented tabular data.
//!
//! Columns are immutable once ingestion produced them and are shared through
//! `Arc<Column>` between a dataset's blob and every downstream node reading
//! it. Min/max are computed once at construction.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Date,
}

impl DataType {
    pub fn display_name(&self) -> &'static str {
        match self {
            DataType::String => "Text",
            DataType::Number => "Number",
            DataType::Date => "Date",
        }
    }
}

/// Name and type of a column, available before its values are loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnHeader {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl ColumnHeader {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Typed column storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    String(Vec<String>),
    /// Missing cells are `NaN`.
    Number(Vec<f64>),
    Date(Vec<NaiveDateTime>),
}

/// Value range of a number or date column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnRange {
    Number { min: f64, max: f64 },
    Date { min: NaiveDateTime, max: NaiveDateTime },
}

/// A shared column compared by identity.
///
/// Columns never change after construction, so two references to the same
/// instance always hold the same values and a new instance means new content.
#[derive(Debug, Clone)]
pub struct ColumnRef(Arc<Column>);

impl ColumnRef {
    pub fn new(column: &Arc<Column>) -> Self {
        Self(Arc::clone(column))
    }

    pub fn column(&self) -> &Arc<Column> {
        &self.0
    }
}

impl PartialEq for ColumnRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ColumnRef {}

/// An immutable named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: ColumnValues,
    range: Option<ColumnRange>,
}

impl Column {
    pub fn string(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::String(values),
            range: None,
        }
    }

    pub fn number(name: impl Into<String>, values: Vec<f64>) -> Self {
        let range = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
            .map(|(min, max)| ColumnRange::Number { min, max });
        Self {
            name: name.into(),
            values: ColumnValues::Number(values),
            range,
        }
    }

    pub fn date(name: impl Into<String>, values: Vec<NaiveDateTime>) -> Self {
        let range = match (values.iter().min(), values.iter().max()) {
            (Some(&min), Some(&max)) => Some(ColumnRange::Date { min, max }),
            _ => None,
        };
        Self {
            name: name.into(),
            values: ColumnValues::Date(values),
            range,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        match self.values {
            ColumnValues::String(_) => DataType::String,
            ColumnValues::Number(_) => DataType::Number,
            ColumnValues::Date(_) => DataType::Date,
        }
    }

    pub fn header(&self) -> ColumnHeader {
        ColumnHeader::new(self.name.clone(), self.data_type())
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        match &self.values {
            ColumnValues::String(v) => v.len(),
            ColumnValues::Number(v) => v.len(),
            ColumnValues::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Min/max, present for number and date columns with at least one value.
    pub fn range(&self) -> Option<ColumnRange> {
        self.range
    }

    /// Distinct values of a string column in order of first occurrence.
    pub fn distinct_values(&self) -> Option<Vec<&str>> {
        let ColumnValues::String(values) = &self.values else {
            return None;
        };
        let mut seen = HashSet::new();
        Some(
            values
                .iter()
                .map(String::as_str)
                .filter(|v| seen.insert(*v))
                .collect(),
        )
    }

    /// New column containing only the rows where `keep` is true.
    pub fn retain_rows(&self, keep: &[bool]) -> Column {
        fn pick<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep.iter())
                .filter(|(_, k)| **k)
                .map(|(v, _)| v.clone())
                .collect()
        }

        match &self.values {
            ColumnValues::String(v) => Column::string(self.name.clone(), pick(v, keep)),
            ColumnValues::Number(v) => Column::number(self.name.clone(), pick(v, keep)),
            ColumnValues::Date(v) => Column::date(self.name.clone(), pick(v, keep)),
        }
    }

    /// Short human readable summary, e.g. `"↓ 1 ↑ 9"` or `"3 Unique"`.
    pub fn summary(&self) -> String {
        match (&self.values, self.range) {
            (ColumnValues::String(_), _) => {
                let unique = self.distinct_values().map(|d| d.len()).unwrap_or(0);
                format!("{} Unique", unique)
            }
            (_, Some(ColumnRange::Number { min, max })) => format!("↓ {} ↑ {}", min, max),
            (_, Some(ColumnRange::Date { min, max })) => {
                format!("↓ {} ↑ {}", min.format("%Y-%m-%d"), max.format("%Y-%m-%d"))
            }
            _ => String::new(),
        }
    }
}

/// Largest column length, `None` when there are no columns.
pub fn row_count(columns: &[Arc<Column>]) -> Option<usize> {
    columns.iter().map(|c| c.len()).max()
}

/// Whether two column lists share the very same column instances.
pub fn same_columns(a: &[Arc<Column>], b: &[Arc<Column>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
}
