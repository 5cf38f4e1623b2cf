//! In-process engine without a GPU.
//!
//! Keeps the pushed descriptors and positions, derives one cuboid per
//! datacube and lets the caller trigger layout notifications. Used by the
//! headless runner and by tests.

use crate::graph::id::NodeId;
use crate::graph::node_kind::NodeKind;
use crate::scene::codec::DatacubeIdCodec;
use crate::scene::descriptor::DatacubeDescriptor;
use crate::scene::engine::{
    CameraState, Cuboid, Extent, LayoutObserver, LayoutUpdate, SubscriptionId, VisualizationEngine,
};
use crate::types::{ScenePoint, Vec3};
use std::collections::BTreeMap;

/// Default viewport size.
pub const DEFAULT_CANVAS_SIZE: (u32, u32) = (1280, 720);

/// Normalized LAB of erroneous datacubes.
const ERROR_LAB: Vec3 = [0.55, 0.82, 0.75];

fn kind_lab(kind: NodeKind) -> Vec3 {
    match kind {
        NodeKind::Dataset => [0.62, 0.45, 0.32],
        NodeKind::DateFilter => [0.70, 0.40, 0.60],
        NodeKind::ColorMapping => [0.75, 0.62, 0.70],
        NodeKind::PointPrimitive => [0.58, 0.66, 0.40],
        NodeKind::LinePrimitive => [0.64, 0.55, 0.30],
    }
}

pub struct HeadlessEngine {
    datacubes: Vec<DatacubeDescriptor>,
    positions: BTreeMap<NodeId, ScenePoint>,
    observers: Vec<(SubscriptionId, LayoutObserver)>,
    next_subscription: u64,
    camera: CameraState,
    canvas_size: (u32, u32),
    perspective: bool,
    datacube_pushes: usize,
    position_pushes: usize,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_SIZE)
    }
}

impl HeadlessEngine {
    pub fn new(canvas_size: (u32, u32)) -> Self {
        Self {
            datacubes: Vec::new(),
            positions: BTreeMap::new(),
            observers: Vec::new(),
            next_subscription: 0,
            camera: CameraState::default(),
            canvas_size,
            perspective: true,
            datacube_pushes: 0,
            position_pushes: 0,
        }
    }

    pub fn set_camera(&mut self, camera: CameraState) {
        self.camera = camera;
    }

    pub fn is_perspective(&self) -> bool {
        self.perspective
    }

    /// Number of `set_datacubes` calls so far.
    pub fn datacube_pushes(&self) -> usize {
        self.datacube_pushes
    }

    /// Number of `set_datacube_positions` calls so far.
    pub fn position_pushes(&self) -> usize {
        self.position_pushes
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver a layout notification to every observer.
    pub fn emit_layout(&mut self, updates: &[LayoutUpdate]) {
        tracing::trace!(
            "Emitting layout for {} datacube(s) to {} observer(s)",
            updates.len(),
            self.observers.len()
        );
        for (_, observer) in self.observers.iter_mut() {
            observer(updates);
        }
    }

    /// Lay the datacubes out on a square grid with unit spacing and notify
    /// observers.
    pub fn arrange_grid(&mut self) -> Vec<LayoutUpdate> {
        let columns = (self.datacubes.len() as f64).sqrt().ceil().max(1.0) as usize;
        let updates: Vec<LayoutUpdate> = self
            .datacubes
            .iter()
            .enumerate()
            .filter_map(|(i, d)| {
                let id = DatacubeIdCodec::encode(d.id)?;
                Some(LayoutUpdate {
                    id,
                    position: ScenePoint::new((i % columns) as f64, (i / columns) as f64),
                })
            })
            .collect();
        self.emit_layout(&updates);
        updates
    }
}

impl VisualizationEngine for HeadlessEngine {
    fn set_datacubes(&mut self, datacubes: Vec<DatacubeDescriptor>) {
        self.datacube_pushes += 1;
        self.datacubes = datacubes;
    }

    fn datacubes(&self) -> &[DatacubeDescriptor] {
        &self.datacubes
    }

    fn set_datacube_positions(&mut self, positions: BTreeMap<NodeId, ScenePoint>) {
        self.position_pushes += 1;
        self.positions = positions;
    }

    fn datacube_positions(&self) -> &BTreeMap<NodeId, ScenePoint> {
        &self.positions
    }

    fn subscribe_layout(&mut self, observer: LayoutObserver) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, observer));
        id
    }

    fn unsubscribe_layout(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    fn camera(&self) -> CameraState {
        self.camera
    }

    fn canvas_size(&self) -> (u32, u32) {
        self.canvas_size
    }

    fn cuboids(&self) -> Vec<Cuboid> {
        self.datacubes
            .iter()
            .map(|d| {
                let height = d.relative_height as f32;
                let color = if d.is_erroneous {
                    ERROR_LAB
                } else if d.is_pending {
                    let [l, _, _] = kind_lab(d.kind);
                    [l, 0.5, 0.5]
                } else {
                    kind_lab(d.kind)
                };
                Cuboid {
                    id: DatacubeIdCodec::encode(d.id),
                    color_lab: Some(color),
                    translate_y: height / 2.0,
                    scale_y: height,
                    id_buffer_only: false,
                    extent: Some(Extent::default()),
                    points: None,
                }
            })
            .collect()
    }

    fn set_perspective(&mut self, perspective: bool) {
        tracing::debug!(
            "Camera projection: {}",
            if perspective { "perspective" } else { "orthographic" }
        );
        self.perspective = perspective;
    }
}
