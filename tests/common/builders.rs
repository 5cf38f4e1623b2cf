//! Test data builders for graphs, columns and dataset files

use datacubes_rs::data::{Column, SourceKind};
use datacubes_rs::graph::{DatasetPatch, Graph, GraphStore, NodeId, NodeKind};
use datacubes_rs::types::GraphPoint;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// A number column `0, 1, .., rows - 1`.
pub fn number_column(name: &str, rows: usize) -> Arc<Column> {
    Arc::new(Column::number(name, (0..rows).map(|i| i as f64).collect()))
}

/// Builder for graphs with loaded datasets
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
        }
    }

    pub fn node(mut self, id: u32, kind: NodeKind, position: GraphPoint) -> Self {
        self.graph
            .add_node_with_id(NodeId(id), kind, position)
            .unwrap();
        self
    }

    /// A dataset node whose single column has `rows` rows.
    pub fn dataset(mut self, id: u32, position: GraphPoint, rows: usize) -> Self {
        let column = number_column("value", rows);
        self.graph
            .add_node_with_id(NodeId(id), NodeKind::Dataset, position)
            .unwrap();
        let patch = DatasetPatch {
            source_kind: Some(SourceKind::Csv),
            column_headers: Some(vec![column.header()]),
            columns: Some(vec![column]),
            is_loading: Some(false),
            ..Default::default()
        };
        self.graph.apply_patch(NodeId(id), patch.into()).unwrap();
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

/// Write a CSV file with a header and `rows` numbered rows.
pub fn write_csv(dir: &tempfile::TempDir, name: &str, rows: usize) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "id,city,day").unwrap();
    for i in 0..rows {
        writeln!(file, "{},city{},2024-01-{:02}", i, i % 7, i % 28 + 1).unwrap();
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_builder() {
        let graph = GraphBuilder::new()
            .dataset(1, GraphPoint::new(400.0, 20.0), 10)
            .node(2, NodeKind::PointPrimitive, GraphPoint::new(700.0, 20.0))
            .build();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.node(NodeId(1)).unwrap().state.row_count(), Some(10));
    }
}
