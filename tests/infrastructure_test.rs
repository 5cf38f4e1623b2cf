//! Test to verify test infrastructure works correctly

mod common;

use common::builders::{number_column, GraphBuilder};
use datacubes_rs::graph::{GraphStore, NodeId, NodeKind};
use datacubes_rs::types::GraphPoint;

#[test]
fn test_infrastructure_setup() {
    // Test that builders work
    let graph = GraphBuilder::new()
        .dataset(3, GraphPoint::new(400.0, 20.0), 25)
        .build();

    let node = graph.node(NodeId(3)).unwrap();
    assert_eq!(node.kind, NodeKind::Dataset);
    assert_eq!(node.state.row_count(), Some(25));
    assert!(!node.state.is_pending());
    assert_eq!(number_column("v", 4).len(), 4);
}

#[test]
fn test_float_comparison() {
    common::assert_float_eq(1.0, 1.0000001, 0.001);
}

#[test]
#[should_panic]
fn test_float_comparison_fails() {
    common::assert_float_eq(1.0, 2.0, 0.001);
}
