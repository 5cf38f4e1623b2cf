//! The 3D datacube scene and its synchronization with the graph.

pub mod codec;
pub mod coords;
pub mod descriptor;
pub mod engine;
pub mod headless;
pub mod sync;

pub use codec::DatacubeIdCodec;
pub use coords::{is_negligible, CoordinateMapper, POSITION_EPSILON};
pub use descriptor::{
    content_key, derive_descriptors, overall_max_row_count, relative_height, DatacubeDescriptor,
    DescriptorContent, EncodingColumns,
};
pub use engine::{
    CameraState, Cuboid, EngineHandle, Extent, LayoutObserver, LayoutUpdate, SubscriptionId,
    VisualizationEngine,
};
pub use headless::HeadlessEngine;
pub use sync::{ForwardOutcome, SceneSynchronizer};
