//! Per-node state blobs.
//!
//! Every node kind carries its own state struct. Dataset state is written by
//! the dataset reducer through [`DatasetPatch`]es; the state of downstream
//! nodes is partly user-edited and partly derived by [`flow`](super::flow).

use crate::data::{row_count, same_columns, Column, ColumnHeader, SourceKind};
use crate::graph::node_kind::NodeKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

// ==================== Dataset ====================

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetState {
    pub source_kind: SourceKind,
    pub column_headers: Vec<ColumnHeader>,
    pub columns: Vec<Arc<Column>>,
    pub is_loading: bool,
    pub remote_uri: Option<String>,
    pub spreadsheet_uri: Option<String>,
    pub force_refresh: bool,
    pub includes_header: bool,
    pub delimiter: Option<String>,
    /// Local file bound to the node.
    pub file: Option<PathBuf>,
}

impl Default for DatasetState {
    fn default() -> Self {
        Self {
            source_kind: SourceKind::None,
            column_headers: Vec::new(),
            columns: Vec::new(),
            is_loading: true,
            remote_uri: None,
            spreadsheet_uri: None,
            force_refresh: true,
            includes_header: true,
            delimiter: None,
            file: None,
        }
    }
}

impl DatasetState {
    pub fn row_count(&self) -> usize {
        row_count(&self.columns).unwrap_or(0)
    }

    /// Headers and columns are both present.
    pub fn is_loaded(&self) -> bool {
        !self.column_headers.is_empty() && !self.columns.is_empty()
    }
}

/// Partial update of a [`DatasetState`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetPatch {
    pub source_kind: Option<SourceKind>,
    pub column_headers: Option<Vec<ColumnHeader>>,
    pub columns: Option<Vec<Arc<Column>>>,
    pub is_loading: Option<bool>,
    pub remote_uri: Option<String>,
    pub spreadsheet_uri: Option<String>,
    pub force_refresh: Option<bool>,
    pub includes_header: Option<bool>,
    pub delimiter: Option<String>,
    pub file: Option<PathBuf>,
}

impl DatasetPatch {
    pub fn is_empty(&self) -> bool {
        *self == DatasetPatch::default()
    }

    /// Apply to `state`, returning whether anything changed.
    pub fn apply(self, state: &mut DatasetState) -> bool {
        fn set<T: PartialEq>(slot: &mut T, value: Option<T>) -> bool {
            match value {
                Some(v) if *slot != v => {
                    *slot = v;
                    true
                }
                _ => false,
            }
        }

        let mut changed = false;
        changed |= set(&mut state.source_kind, self.source_kind);
        changed |= set(&mut state.column_headers, self.column_headers);
        if let Some(columns) = self.columns {
            if !same_columns(&state.columns, &columns) {
                state.columns = columns;
                changed = true;
            }
        }
        changed |= set(&mut state.is_loading, self.is_loading);
        changed |= set(&mut state.remote_uri, self.remote_uri.map(Some));
        changed |= set(&mut state.spreadsheet_uri, self.spreadsheet_uri.map(Some));
        changed |= set(&mut state.force_refresh, self.force_refresh);
        changed |= set(&mut state.includes_header, self.includes_header);
        changed |= set(&mut state.delimiter, self.delimiter.map(Some));
        changed |= set(&mut state.file, self.file.map(Some));
        changed
    }
}

// ==================== Date filter ====================

#[derive(Debug, Clone, PartialEq)]
pub struct DateFilterState {
    pub date_column: Option<String>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    /// Columns of the connected dataset, shared by reference.
    pub input_columns: Vec<Arc<Column>>,
    pub filtered_columns: Vec<Arc<Column>>,
    pub is_pending: bool,
    pub error_message: Option<String>,
}

impl Default for DateFilterState {
    fn default() -> Self {
        Self {
            date_column: None,
            from: None,
            to: None,
            input_columns: Vec::new(),
            filtered_columns: Vec::new(),
            is_pending: true,
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateFilterPatch {
    pub date_column: Option<String>,
    /// `Some(None)` clears the bound.
    pub from: Option<Option<NaiveDateTime>>,
    pub to: Option<Option<NaiveDateTime>>,
}

impl DateFilterPatch {
    pub fn apply(self, state: &mut DateFilterState) -> bool {
        let before = (state.date_column.clone(), state.from, state.to);
        if let Some(column) = self.date_column {
            state.date_column = Some(column);
        }
        if let Some(from) = self.from {
            state.from = from;
        }
        if let Some(to) = self.to {
            state.to = to;
        }
        let changed = before != (state.date_column.clone(), state.from, state.to);
        if changed {
            // Forces the next propagation to re-derive the filtered columns.
            state.input_columns.clear();
        }
        changed
    }
}

// ==================== Color mapping ====================

/// Gradient stops in sRGB, each component in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub stops: Vec<[f32; 3]>,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            stops: vec![[0.267, 0.005, 0.329], [0.128, 0.567, 0.551], [0.993, 0.906, 0.144]],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorMappingState {
    pub palette: ColorPalette,
    pub column: Option<Arc<Column>>,
    pub is_pending: bool,
}

impl Default for ColorMappingState {
    fn default() -> Self {
        Self {
            palette: ColorPalette::default(),
            column: None,
            is_pending: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorMappingPatch {
    pub palette: Option<ColorPalette>,
}

// ==================== Encodings ====================

/// A column mapped through a palette, as fed into an encoding's color slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorEncoding {
    pub column: Arc<Column>,
    pub palette: ColorPalette,
}

/// State of point and line primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingState {
    pub x_column: Option<Arc<Column>>,
    pub y_column: Option<Arc<Column>>,
    pub z_column: Option<Arc<Column>>,
    pub size_column: Option<Arc<Column>>,
    pub colors: Option<ColorEncoding>,
    pub is_pending: bool,
}

impl Default for EncodingState {
    fn default() -> Self {
        Self {
            x_column: None,
            y_column: None,
            z_column: None,
            size_column: None,
            colors: None,
            is_pending: true,
        }
    }
}

// ==================== Polymorphic blob ====================

/// The state blob of a graph node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    Dataset(DatasetState),
    DateFilter(DateFilterState),
    ColorMapping(ColorMappingState),
    PointPrimitive(EncodingState),
    LinePrimitive(EncodingState),
}

impl NodeState {
    /// Initial state for a freshly created node.
    pub fn new(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Dataset => NodeState::Dataset(DatasetState::default()),
            NodeKind::DateFilter => NodeState::DateFilter(DateFilterState::default()),
            NodeKind::ColorMapping => NodeState::ColorMapping(ColorMappingState::default()),
            NodeKind::PointPrimitive => NodeState::PointPrimitive(EncodingState::default()),
            NodeKind::LinePrimitive => NodeState::LinePrimitive(EncodingState::default()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeState::Dataset(_) => NodeKind::Dataset,
            NodeState::DateFilter(_) => NodeKind::DateFilter,
            NodeState::ColorMapping(_) => NodeKind::ColorMapping,
            NodeState::PointPrimitive(_) => NodeKind::PointPrimitive,
            NodeState::LinePrimitive(_) => NodeKind::LinePrimitive,
        }
    }

    /// Rows produced by a tabular node, `None` for other kinds.
    pub fn row_count(&self) -> Option<usize> {
        match self {
            NodeState::Dataset(s) => Some(s.row_count()),
            NodeState::DateFilter(s) => Some(row_count(&s.filtered_columns).unwrap_or(0)),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        match self {
            NodeState::Dataset(s) => s.is_loading,
            NodeState::DateFilter(s) => s.is_pending,
            NodeState::ColorMapping(s) => s.is_pending,
            NodeState::PointPrimitive(s) | NodeState::LinePrimitive(s) => s.is_pending,
        }
    }

    pub fn is_erroneous(&self) -> bool {
        matches!(self, NodeState::DateFilter(s) if s.error_message.is_some())
    }

    /// Columns this node offers to downstream nodes.
    pub fn output_columns(&self) -> &[Arc<Column>] {
        match self {
            NodeState::Dataset(s) => &s.columns,
            NodeState::DateFilter(s) => &s.filtered_columns,
            _ => &[],
        }
    }

    pub fn as_dataset(&self) -> Option<&DatasetState> {
        match self {
            NodeState::Dataset(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_encoding(&self) -> Option<&EncodingState> {
        match self {
            NodeState::PointPrimitive(s) | NodeState::LinePrimitive(s) => Some(s),
            _ => None,
        }
    }
}

/// A patch addressed to one node's blob.
#[derive(Debug, Clone, PartialEq)]
pub enum StatePatch {
    Dataset(DatasetPatch),
    DateFilter(DateFilterPatch),
    ColorMapping(ColorMappingPatch),
}

impl StatePatch {
    pub fn name(&self) -> &'static str {
        match self {
            StatePatch::Dataset(_) => "dataset",
            StatePatch::DateFilter(_) => "date filter",
            StatePatch::ColorMapping(_) => "color mapping",
        }
    }

    /// Apply to a matching blob. Returns `None` on a kind mismatch, otherwise
    /// whether the blob changed.
    pub fn apply(self, state: &mut NodeState) -> Option<bool> {
        match (self, state) {
            (StatePatch::Dataset(p), NodeState::Dataset(s)) => Some(p.apply(s)),
            (StatePatch::DateFilter(p), NodeState::DateFilter(s)) => Some(p.apply(s)),
            (StatePatch::ColorMapping(p), NodeState::ColorMapping(s)) => Some(match p.palette {
                Some(palette) if palette != s.palette => {
                    s.palette = palette;
                    true
                }
                _ => false,
            }),
            _ => None,
        }
    }
}

impl From<DatasetPatch> for StatePatch {
    fn from(patch: DatasetPatch) -> Self {
        StatePatch::Dataset(patch)
    }
}

impl From<DateFilterPatch> for StatePatch {
    fn from(patch: DateFilterPatch) -> Self {
        StatePatch::DateFilter(patch)
    }
}

impl From<ColorMappingPatch> for StatePatch {
    fn from(patch: ColorMappingPatch) -> Self {
        StatePatch::ColorMapping(patch)
    }
}
