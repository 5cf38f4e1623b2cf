//! Graph storage.
//!
//! [`GraphStore`] is the narrow interface the scene synchronizer needs: read
//! nodes, patch blobs, move nodes and clear the selection. [`Graph`] is the
//! in-memory implementation that also owns edges and validates connections.

use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::{EdgeId, NodeId};
use crate::graph::node_kind::NodeKind;
use crate::graph::state::{NodeState, StatePatch};
use crate::types::GraphPoint;
use std::collections::BTreeMap;

/// A node with its position and state blob.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: GraphPoint,
    pub state: NodeState,
    pub selected: bool,
}

/// Output handle of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourcePort {
    /// The whole table of a dataset or filter.
    Dataset,
    /// A single named column of a dataset or filter.
    Column(String),
    /// The mapped colors of a color mapping node.
    Colors,
}

/// Input handle of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSlot {
    Dataset,
    Column,
    X,
    Y,
    Z,
    Size,
    Color,
}

impl TargetSlot {
    pub fn name(&self) -> &'static str {
        match self {
            TargetSlot::Dataset => "dataset",
            TargetSlot::Column => "column",
            TargetSlot::X => "x coordinate",
            TargetSlot::Y => "y coordinate",
            TargetSlot::Z => "z coordinate",
            TargetSlot::Size => "size",
            TargetSlot::Color => "color",
        }
    }

    /// Slots accepting a single column.
    pub fn takes_column(&self) -> bool {
        !matches!(self, TargetSlot::Dataset | TargetSlot::Color)
    }
}

/// A connection from an output handle to an input slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub source_port: SourcePort,
    pub target: NodeId,
    pub target_slot: TargetSlot,
}

/// Graph operations the synchronization core relies on.
pub trait GraphStore {
    fn node(&self, id: NodeId) -> Option<&GraphNode>;

    /// All nodes in id order.
    fn nodes(&self) -> Vec<&GraphNode>;

    /// Apply a blob patch; returns whether the blob changed.
    fn apply_patch(&mut self, id: NodeId, patch: StatePatch) -> GraphResult<bool>;

    /// Move a node by `diff` graph-space pixels.
    fn update_node_position(&mut self, id: NodeId, diff: GraphPoint) -> GraphResult<()>;

    fn unselect_all(&mut self);

    fn selected(&self) -> Vec<NodeId>;
}

/// In-memory dataflow graph.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, GraphNode>,
    edges: Vec<Edge>,
    next_node: u32,
    next_edge: u32,
    /// Bumped on every mutation.
    revision: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges ending at `target`.
    pub fn incoming(&self, target: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.target == target)
    }

    /// The edge feeding `slot` of `target`, if any.
    pub fn input(&self, target: NodeId, slot: TargetSlot) -> Option<&Edge> {
        self.incoming(target).find(|e| e.target_slot == slot)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    // ── Nodes ──

    /// Add a node with the next free id.
    pub fn add_node(&mut self, kind: NodeKind, position: GraphPoint) -> GraphResult<NodeId> {
        while self.nodes.contains_key(&NodeId(self.next_node)) {
            self.next_node += 1;
        }
        let id = NodeId(self.next_node);
        self.add_node_with_id(id, kind, position)
    }

    /// Add a node with a caller-chosen id.
    pub fn add_node_with_id(
        &mut self,
        id: NodeId,
        kind: NodeKind,
        position: GraphPoint,
    ) -> GraphResult<NodeId> {
        if !id.is_valid() || self.nodes.contains_key(&id) {
            return Err(GraphError::InvalidNodeId(id));
        }
        self.nodes.insert(
            id,
            GraphNode {
                id,
                kind,
                position,
                state: NodeState::new(kind),
                selected: false,
            },
        );
        self.next_node = self.next_node.max(id.0.saturating_add(1));
        self.touch();
        tracing::debug!("Added {} node {}", kind, id);
        Ok(id)
    }

    /// Remove a node together with its edges.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<GraphNode> {
        let node = self.nodes.remove(&id).ok_or(GraphError::UnknownNode(id))?;
        self.edges.retain(|e| e.source != id && e.target != id);
        self.touch();
        tracing::debug!("Removed {} node {}", node.kind, id);
        Ok(node)
    }

    /// Place a node at an absolute position (user drag).
    pub fn set_position(&mut self, id: NodeId, position: GraphPoint) -> GraphResult<()> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
        if node.position != position {
            node.position = position;
            self.touch();
        }
        Ok(())
    }

    pub fn select(&mut self, id: NodeId, additive: bool) -> GraphResult<()> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::UnknownNode(id));
        }
        for node in self.nodes.values_mut() {
            if node.id == id {
                node.selected = true;
            } else if !additive {
                node.selected = false;
            }
        }
        self.touch();
        Ok(())
    }

    // ── Edges ──

    /// Connect an output handle to an input slot.
    pub fn connect(
        &mut self,
        source: NodeId,
        source_port: SourcePort,
        target: NodeId,
        target_slot: TargetSlot,
    ) -> GraphResult<EdgeId> {
        let source_kind = self.node(source).ok_or(GraphError::UnknownNode(source))?.kind;
        let target_kind = self.node(target).ok_or(GraphError::UnknownNode(target))?.kind;
        if source == target {
            return Err(GraphError::InvalidConnection(format!(
                "node {} cannot feed itself",
                source
            )));
        }
        validate_connection(source_kind, &source_port, target_kind, target_slot)?;
        if self.input(target, target_slot).is_some() {
            return Err(GraphError::SlotOccupied {
                node: target,
                slot: target_slot.name(),
            });
        }
        if self.reaches(target, source) {
            return Err(GraphError::CycleDetected);
        }

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.push(Edge {
            id,
            source,
            source_port,
            target,
            target_slot,
        });
        self.touch();
        Ok(id)
    }

    pub fn disconnect(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let index = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or(GraphError::UnknownEdge(id))?;
        let edge = self.edges.remove(index);
        self.touch();
        Ok(edge)
    }

    /// Whether `to` is reachable from `from` along edges.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.edges.iter().filter(|e| e.source == id).map(|e| e.target));
            }
        }
        false
    }
}

fn validate_connection(
    source_kind: NodeKind,
    port: &SourcePort,
    target_kind: NodeKind,
    slot: TargetSlot,
) -> GraphResult<()> {
    let ok = match port {
        SourcePort::Dataset => {
            source_kind.is_tabular()
                && slot == TargetSlot::Dataset
                && target_kind == NodeKind::DateFilter
        }
        SourcePort::Column(_) => {
            source_kind.is_tabular()
                && match target_kind {
                    NodeKind::ColorMapping => slot == TargetSlot::Column,
                    kind if kind.is_encoding() => {
                        slot.takes_column() && slot != TargetSlot::Column
                    }
                    _ => false,
                }
        }
        SourcePort::Colors => {
            source_kind == NodeKind::ColorMapping
                && slot == TargetSlot::Color
                && target_kind.is_encoding()
        }
    };
    if ok {
        Ok(())
    } else {
        Err(GraphError::InvalidConnection(format!(
            "{} output {:?} cannot feed the {} slot of a {}",
            source_kind,
            port,
            slot.name(),
            target_kind
        )))
    }
}

impl GraphStore for Graph {
    fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    fn nodes(&self) -> Vec<&GraphNode> {
        self.nodes.values().collect()
    }

    fn apply_patch(&mut self, id: NodeId, patch: StatePatch) -> GraphResult<bool> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
        let name = patch.name();
        let changed = patch.apply(&mut node.state).ok_or(GraphError::PatchMismatch {
            node: id,
            kind: node.kind,
            patch: name,
        })?;
        if changed {
            self.touch();
        }
        Ok(changed)
    }

    fn update_node_position(&mut self, id: NodeId, diff: GraphPoint) -> GraphResult<()> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
        node.position = node.position.offset(diff);
        self.touch();
        Ok(())
    }

    fn unselect_all(&mut self) {
        let mut changed = false;
        for node in self.nodes.values_mut() {
            changed |= std::mem::replace(&mut node.selected, false);
        }
        if changed {
            self.touch();
        }
    }

    fn selected(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.selected)
            .map(|n| n.id)
            .collect()
    }
}
