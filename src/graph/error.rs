//! Graph-specific error types.

use crate::graph::id::{EdgeId, NodeId};
use crate::graph::node_kind::NodeKind;
use thiserror::Error;

/// Errors that can occur while editing the graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Unknown edge {0:?}")]
    UnknownEdge(EdgeId),

    #[error("Node id {0} is out of range or already taken")]
    InvalidNodeId(NodeId),

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    #[error("Slot {slot} of node {node} is already connected")]
    SlotOccupied { node: NodeId, slot: &'static str },

    #[error("Connection would create a cycle")]
    CycleDetected,

    #[error("Patch for {patch} does not apply to {kind} node {node}")]
    PatchMismatch {
        node: NodeId,
        kind: NodeKind,
        patch: &'static str,
    },
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
