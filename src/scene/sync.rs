//! Bidirectional graph/scene synchronization.
//!
//! Forward: descriptors and positions are derived from the graph and pushed
//! to the engine, each only when it differs from the last push. Reverse:
//! layout notifications are mapped back to graph space and written as
//! position diffs, skipping deltas below [`POSITION_EPSILON`] so that a
//! forward push of a position does not come back as a write.
//!
//! [`POSITION_EPSILON`]: crate::scene::coords::POSITION_EPSILON

use crate::graph::{GraphStore, NodeId};
use crate::scene::codec::DatacubeIdCodec;
use crate::scene::coords::{is_negligible, CoordinateMapper};
use crate::scene::descriptor::{content_key, derive_descriptors, DescriptorContent};
use crate::scene::engine::{EngineHandle, LayoutUpdate, SubscriptionId};
use crate::types::ScenePoint;
use std::collections::BTreeMap;

/// What a forward pass pushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardOutcome {
    pub datacubes_pushed: bool,
    pub positions_pushed: bool,
}

pub struct SceneSynchronizer {
    engine: EngineHandle,
    mapper: CoordinateMapper,
    subscription: Option<SubscriptionId>,
    last_content: Option<Vec<DescriptorContent>>,
    last_positions: Option<BTreeMap<NodeId, ScenePoint>>,
}

impl SceneSynchronizer {
    pub fn new(engine: EngineHandle, mapper: CoordinateMapper) -> Self {
        Self {
            engine,
            mapper,
            subscription: None,
            last_content: None,
            last_positions: None,
        }
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Register `on_layout` for the engine's layout notifications. A previous
    /// registration is removed first.
    pub fn attach(&mut self, mut on_layout: impl FnMut(Vec<LayoutUpdate>) + 'static) {
        self.detach();
        let id = self
            .engine
            .borrow_mut()
            .subscribe_layout(Box::new(move |updates| on_layout(updates.to_vec())));
        tracing::debug!("Subscribed to engine layout ({:?})", id);
        self.subscription = Some(id);
    }

    pub fn detach(&mut self) {
        if let Some(id) = self.subscription.take() {
            // The engine may be mid-notification; a busy engine keeps the
            // observer until it is dropped.
            match self.engine.try_borrow_mut() {
                Ok(mut engine) => {
                    engine.unsubscribe_layout(id);
                    tracing::debug!("Unsubscribed from engine layout ({:?})", id);
                }
                Err(_) => tracing::warn!("Engine busy, could not unsubscribe {:?}", id),
            }
        }
    }

    /// Push the graph's current descriptors and positions to the engine.
    pub fn sync_forward<G: GraphStore + ?Sized>(&mut self, graph: &G) -> ForwardOutcome {
        let descriptors = derive_descriptors(graph, &self.mapper);
        let content = content_key(&descriptors);
        let positions: BTreeMap<NodeId, ScenePoint> = descriptors
            .iter()
            .filter_map(|d| d.position.map(|p| (d.id, p)))
            .collect();

        let mut outcome = ForwardOutcome::default();
        let mut engine = self.engine.borrow_mut();

        if self.last_content.as_ref() != Some(&content) {
            tracing::debug!("Pushing {} datacube(s) to the engine", descriptors.len());
            engine.set_datacubes(descriptors);
            self.last_content = Some(content);
            outcome.datacubes_pushed = true;
        } else {
            tracing::trace!("Datacube content unchanged, skipping push");
        }

        if self.last_positions.as_ref() != Some(&positions) {
            tracing::trace!("Pushing {} datacube position(s)", positions.len());
            engine.set_datacube_positions(positions.clone());
            self.last_positions = Some(positions);
            outcome.positions_pushed = true;
        }

        outcome
    }

    /// Write one layout notification back into the graph. Returns the number
    /// of nodes moved.
    pub fn apply_layout<G: GraphStore + ?Sized>(
        &mut self,
        graph: &mut G,
        updates: &[LayoutUpdate],
    ) -> usize {
        let mut reported: BTreeMap<NodeId, ScenePoint> = BTreeMap::new();
        for update in updates {
            match DatacubeIdCodec::decode(update.id) {
                Some(node) => {
                    reported.insert(node, update.position);
                }
                None => tracing::trace!("Ignoring layout of engine object {:?}", update.id),
            }
        }

        let moves: Vec<(NodeId, crate::types::GraphPoint)> = graph
            .nodes()
            .into_iter()
            .filter_map(|node| {
                let target = self.mapper.to_graph(*reported.get(&node.id)?);
                let delta = node.position.delta_to(target);
                (!is_negligible(delta)).then_some((node.id, delta))
            })
            .collect();

        for (id, delta) in &moves {
            if let Err(e) = graph.update_node_position(*id, *delta) {
                tracing::warn!("Failed to move node {}: {}", id, e);
            }
        }
        if !moves.is_empty() {
            graph.unselect_all();
            tracing::debug!("Layout moved {} node(s)", moves.len());
        }
        moves.len()
    }
}

impl Drop for SceneSynchronizer {
    fn drop(&mut self) {
        self.detach();
    }
}
