//! Core geometric types shared by the graph and the scene
//!
//! Two coordinate spaces are in play and they are deliberately distinct types:
//!
//! - [`GraphPoint`] - node positions in the graph editor, in pixels
//! - [`ScenePoint`] - normalized layout positions used by the visualization engine
//!
//! Conversions between the two go through
//! [`CoordinateMapper`](crate::scene::CoordinateMapper) only.

use serde::{Deserialize, Serialize};

/// A position in graph space (editor pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphPoint {
    pub x: f64,
    pub y: f64,
}

impl GraphPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`.
    pub fn delta_to(self, other: GraphPoint) -> GraphPoint {
        GraphPoint::new(other.x - self.x, other.y - self.y)
    }

    pub fn offset(self, diff: GraphPoint) -> GraphPoint {
        GraphPoint::new(self.x + diff.x, self.y + diff.y)
    }
}

/// A position in normalized scene space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenePoint {
    pub x: f64,
    pub y: f64,
}

impl ScenePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Plain 3-component vector as exchanged with the engine and the renderer.
pub type Vec3 = [f32; 3];
