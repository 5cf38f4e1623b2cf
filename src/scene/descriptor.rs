//! Datacube descriptors derived from the graph.
//!
//! Descriptors are recomputed from scratch on every graph change and never
//! stored anywhere else. Each node yields one descriptor; its height is its row
//! count relative to the largest tabular node in the graph.

use crate::data::{Column, ColumnRef};
use crate::graph::{ColorEncoding, GraphStore, NodeId, NodeKind, NodeState};
use crate::scene::coords::CoordinateMapper;
use crate::types::ScenePoint;
use std::sync::Arc;

/// Columns an encoding node maps onto its datacube.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodingColumns {
    pub x: Option<Arc<Column>>,
    pub y: Option<Arc<Column>>,
    pub z: Option<Arc<Column>>,
    pub size: Option<Arc<Column>>,
    pub colors: Option<ColorEncoding>,
}

/// Everything the engine needs to draw one datacube.
#[derive(Debug, Clone, PartialEq)]
pub struct DatacubeDescriptor {
    pub id: NodeId,
    /// Scene-space position of the node.
    pub position: Option<ScenePoint>,
    /// In `(0, 1]`.
    pub relative_height: f64,
    pub kind: NodeKind,
    pub is_pending: bool,
    pub is_erroneous: bool,
    pub encoding: Option<EncodingColumns>,
}

/// Largest row count over all tabular nodes, 0 when none has rows.
pub fn overall_max_row_count<G: GraphStore + ?Sized>(graph: &G) -> usize {
    graph
        .nodes()
        .iter()
        .filter_map(|n| n.state.row_count())
        .max()
        .unwrap_or(0)
}

/// Height of a node with `rows` rows against the graph-wide maximum.
///
/// Non-tabular nodes, nodes without rows and graphs without any rows all get
/// the full height.
pub fn relative_height(rows: Option<usize>, overall_max: usize) -> f64 {
    match rows {
        Some(rows) if rows > 0 && overall_max > 0 => {
            (rows as f64 / overall_max as f64).min(1.0)
        }
        _ => 1.0,
    }
}

/// Derive one descriptor per node, in id order.
pub fn derive_descriptors<G: GraphStore + ?Sized>(
    graph: &G,
    mapper: &CoordinateMapper,
) -> Vec<DatacubeDescriptor> {
    let overall_max = overall_max_row_count(graph);
    graph
        .nodes()
        .into_iter()
        .map(|node| {
            let encoding = match &node.state {
                NodeState::PointPrimitive(s) | NodeState::LinePrimitive(s) => {
                    Some(EncodingColumns {
                        x: s.x_column.clone(),
                        y: s.y_column.clone(),
                        z: s.z_column.clone(),
                        size: s.size_column.clone(),
                        colors: s.colors.clone(),
                    })
                }
                _ => None,
            };
            DatacubeDescriptor {
                id: node.id,
                position: Some(mapper.to_scene(node.position)),
                relative_height: relative_height(node.state.row_count(), overall_max),
                kind: node.kind,
                is_pending: node.state.is_pending(),
                is_erroneous: node.state.is_erroneous(),
                encoding,
            }
        })
        .collect()
}

/// Identity of a descriptor list with positions left out.
///
/// Columns are compared by instance, palettes by value.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorContent {
    pub id: NodeId,
    pub relative_height: f64,
    pub kind: NodeKind,
    pub is_pending: bool,
    pub is_erroneous: bool,
    pub x: Option<ColumnRef>,
    pub y: Option<ColumnRef>,
    pub z: Option<ColumnRef>,
    pub size: Option<ColumnRef>,
    pub colors: Option<(ColumnRef, Vec<[f32; 3]>)>,
}

pub fn content_key(descriptors: &[DatacubeDescriptor]) -> Vec<DescriptorContent> {
    let column_ref = |c: &Option<Arc<Column>>| c.as_ref().map(ColumnRef::new);
    descriptors
        .iter()
        .map(|d| {
            let encoding = d.encoding.as_ref();
            DescriptorContent {
                id: d.id,
                relative_height: d.relative_height,
                kind: d.kind,
                is_pending: d.is_pending,
                is_erroneous: d.is_erroneous,
                x: encoding.and_then(|e| column_ref(&e.x)),
                y: encoding.and_then(|e| column_ref(&e.y)),
                z: encoding.and_then(|e| column_ref(&e.z)),
                size: encoding.and_then(|e| column_ref(&e.size)),
                colors: encoding
                    .and_then(|e| e.colors.as_ref())
                    .map(|c| (ColumnRef::new(&c.column), c.palette.stops.clone())),
            }
        })
        .collect()
}
