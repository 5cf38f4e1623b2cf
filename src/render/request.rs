//! Payload of a high-quality render request.
//!
//! Field names are part of the external renderer's interface and must not
//! change.

use crate::render::color::ColorConverter;
use crate::scene::{DatacubeIdCodec, Extent, VisualizationEngine};
use crate::types::Vec3;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub camera_center: Vec3,
    pub camera_eye: Vec3,
    pub camera_fov_y_degrees: f32,
    pub width: u32,
    pub height: u32,
    pub scene_elements: Vec<SceneElement>,
}

/// Horizontal translation, serialized as `{"0": x, "1": z}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TranslateXz {
    #[serde(rename = "0")]
    pub x: f64,
    #[serde(rename = "1")]
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneElement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(rename = "colorRGB", skip_serializing_if = "Option::is_none")]
    pub color_rgb: Option<Vec3>,
    #[serde(rename = "translateXZ")]
    pub translate_xz: TranslateXz,
    pub translate_y: f32,
    pub scale_y: f32,
    pub id_buffer_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Extent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Vec3>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl RenderRequest {
    /// Snapshot the engine's camera, viewport and cuboids.
    ///
    /// Datacube cuboids get their node's scene-space position and kind;
    /// engine-owned cuboids keep a zero translation and no kind.
    pub fn snapshot(engine: &dyn VisualizationEngine, colors: &dyn ColorConverter) -> Self {
        let camera = engine.camera();
        let (width, height) = engine.canvas_size();
        let positions = engine.datacube_positions();
        let datacubes = engine.datacubes();

        let scene_elements = engine
            .cuboids()
            .into_iter()
            .map(|cuboid| {
                let node = cuboid.id.and_then(DatacubeIdCodec::decode);
                let translate_xz = node
                    .and_then(|id| positions.get(&id))
                    .map(|p| TranslateXz { x: p.x, z: p.y })
                    .unwrap_or_default();
                let kind = node
                    .and_then(|id| datacubes.iter().find(|d| d.id == id))
                    .map(|d| d.kind.as_str().to_string());
                SceneElement {
                    id: cuboid.id.map(|id| id.0),
                    color_rgb: cuboid.color_lab.map(|lab| colors.to_rgb(lab)),
                    translate_xz,
                    translate_y: cuboid.translate_y,
                    scale_y: cuboid.scale_y,
                    id_buffer_only: cuboid.id_buffer_only,
                    extent: cuboid.extent,
                    points: cuboid.points,
                    kind,
                }
            })
            .collect();

        Self {
            camera_center: camera.center,
            camera_eye: camera.eye,
            camera_fov_y_degrees: camera.fov_y_degrees,
            width,
            height,
            scene_elements,
        }
    }
}
