//! Node kind enumeration.
//!
//! This module defines the kinds of nodes a user can place in the dataflow
//! graph. Every kind gets a datacube in the scene; the kind decides which
//! state blob the node carries and how its descriptor is derived.

use serde::{Deserialize, Serialize};

/// Kinds of graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    // Input nodes
    /// A tabular dataset loaded from a file, URL or spreadsheet.
    Dataset,

    // Operator nodes
    /// Keeps the rows of a dataset whose date column falls into a range.
    DateFilter,
    /// Maps a column onto a color palette.
    ColorMapping,

    // Rendering nodes
    /// Scatter-plot style point encoding.
    PointPrimitive,
    /// Polyline encoding.
    LinePrimitive,
}

impl NodeKind {
    /// Get the display name for this node kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Dataset => "Dataset",
            NodeKind::DateFilter => "Date Filter",
            NodeKind::ColorMapping => "Color Mapping",
            NodeKind::PointPrimitive => "Point Primitive",
            NodeKind::LinePrimitive => "Line Primitive",
        }
    }

    /// Identifier sent to the renderer as a scene element's `type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Dataset => "dataset",
            NodeKind::DateFilter => "date-filter",
            NodeKind::ColorMapping => "color-mapping",
            NodeKind::PointPrimitive => "point-primitive",
            NodeKind::LinePrimitive => "line-primitive",
        }
    }

    /// Get all available node kinds.
    pub fn all() -> &'static [NodeKind] {
        &[
            NodeKind::Dataset,
            NodeKind::DateFilter,
            NodeKind::ColorMapping,
            NodeKind::PointPrimitive,
            NodeKind::LinePrimitive,
        ]
    }

    /// Whether nodes of this kind carry rows that count towards relative heights.
    pub fn is_tabular(&self) -> bool {
        matches!(self, NodeKind::Dataset | NodeKind::DateFilter)
    }

    /// Whether nodes of this kind encode columns visually.
    pub fn is_encoding(&self) -> bool {
        matches!(self, NodeKind::PointPrimitive | NodeKind::LinePrimitive)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
