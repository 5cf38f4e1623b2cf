//! Graph-space to scene-space mapping.

use crate::types::{GraphPoint, ScenePoint};

/// Position changes smaller than this on both axes are not written back.
pub const POSITION_EPSILON: f64 = 1e-3;

/// Affine map between graph pixels and normalized scene coordinates.
///
/// `scene = (graph - min) / step` and `graph = scene * step + min`, per axis.
/// Both sync directions must use the same instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    pub min_x: f64,
    pub min_y: f64,
    pub step: f64,
}

impl CoordinateMapper {
    /// Canvas constants of the graph editor.
    pub const GRAPH_CANVAS: CoordinateMapper = CoordinateMapper {
        min_x: 400.0,
        min_y: 20.0,
        step: 300.0,
    };

    pub const fn new(min_x: f64, min_y: f64, step: f64) -> Self {
        Self { min_x, min_y, step }
    }

    pub fn to_scene(&self, p: GraphPoint) -> ScenePoint {
        ScenePoint::new((p.x - self.min_x) / self.step, (p.y - self.min_y) / self.step)
    }

    pub fn to_graph(&self, p: ScenePoint) -> GraphPoint {
        GraphPoint::new(p.x * self.step + self.min_x, p.y * self.step + self.min_y)
    }
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::GRAPH_CANVAS
    }
}

/// Whether a position delta is too small to be worth writing.
pub fn is_negligible(delta: GraphPoint) -> bool {
    delta.x.abs() < POSITION_EPSILON && delta.y.abs() < POSITION_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_mapping() {
        let mapper = CoordinateMapper::GRAPH_CANVAS;
        assert_eq!(mapper.to_graph(ScenePoint::new(1.0, 0.0)), GraphPoint::new(700.0, 20.0));
        assert_eq!(mapper.to_scene(GraphPoint::new(400.0, 320.0)), ScenePoint::new(0.0, 1.0));
    }

    #[test]
    fn test_negligible_threshold() {
        assert!(is_negligible(GraphPoint::new(0.0009, -0.0009)));
        assert!(!is_negligible(GraphPoint::new(0.0011, 0.0)));
        assert!(!is_negligible(GraphPoint::new(0.0, POSITION_EPSILON)));
    }
}
