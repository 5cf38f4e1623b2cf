//! Visualization engine interface.
//!
//! The engine is reached only through an [`EngineHandle`] passed to the
//! components that need it. Layout changes are delivered to explicitly
//! registered observers that must be unsubscribed again.

use crate::graph::id::{DatacubeId, NodeId};
use crate::scene::descriptor::DatacubeDescriptor;
use crate::types::{ScenePoint, Vec3};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A datacube moved by the engine's layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutUpdate {
    pub id: DatacubeId,
    pub position: ScenePoint,
}

/// Callback receiving one layout notification at a time.
pub type LayoutObserver = Box<dyn FnMut(&[LayoutUpdate])>;

/// Token returned by [`VisualizationEngine::subscribe_layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Camera parameters as used by the external renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub center: Vec3,
    pub eye: Vec3,
    pub fov_y_degrees: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0, 0.0],
            eye: [0.0, 2.0, 4.0],
            fov_y_degrees: 45.0,
        }
    }
}

/// Axis-aligned bounds of a cuboid in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extent {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            min_x: -0.5,
            max_x: 0.5,
            min_y: -0.5,
            max_y: 0.5,
            min_z: -0.5,
            max_z: 0.5,
        }
    }
}

/// A drawable cuboid as the engine currently holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    /// Picking id; datacubes carry codec-encoded ids.
    pub id: Option<DatacubeId>,
    /// Engine-native color: CIE LAB with every component scaled to `[0, 1]`.
    pub color_lab: Option<Vec3>,
    pub translate_y: f32,
    pub scale_y: f32,
    pub id_buffer_only: bool,
    pub extent: Option<Extent>,
    pub points: Option<Vec<Vec3>>,
}

/// The 3D engine drawing the datacubes.
pub trait VisualizationEngine {
    /// Replace the datacube list.
    fn set_datacubes(&mut self, datacubes: Vec<DatacubeDescriptor>);

    fn datacubes(&self) -> &[DatacubeDescriptor];

    /// Replace the scene-space positions, keyed by node id.
    fn set_datacube_positions(&mut self, positions: BTreeMap<NodeId, ScenePoint>);

    fn datacube_positions(&self) -> &BTreeMap<NodeId, ScenePoint>;

    fn subscribe_layout(&mut self, observer: LayoutObserver) -> SubscriptionId;

    /// Returns whether the subscription existed.
    fn unsubscribe_layout(&mut self, id: SubscriptionId) -> bool;

    fn camera(&self) -> CameraState;

    /// Viewport size in pixels.
    fn canvas_size(&self) -> (u32, u32);

    fn cuboids(&self) -> Vec<Cuboid>;

    fn set_perspective(&mut self, perspective: bool);
}

/// Shared handle to the engine, owned by the runtime.
pub type EngineHandle = Rc<RefCell<dyn VisualizationEngine>>;
