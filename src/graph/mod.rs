//! The dataflow graph.
//!
//! - [`store`] - nodes, edges, selection and the [`GraphStore`] interface
//! - [`state`] - the per-kind state blobs and their patches
//! - [`flow`] - re-deriving downstream blobs after a mutation

pub mod error;
pub mod flow;
pub mod id;
pub mod node_kind;
pub mod state;
pub mod store;

pub use error::{GraphError, GraphResult};
pub use flow::propagate;
pub use id::{DatacubeId, EdgeId, NodeId};
pub use node_kind::NodeKind;
pub use state::{
    ColorEncoding, ColorMappingPatch, ColorMappingState, ColorPalette, DatasetPatch, DatasetState,
    DateFilterPatch, DateFilterState, EncodingState, NodeState, StatePatch,
};
pub use store::{Edge, Graph, GraphNode, GraphStore, SourcePort, TargetSlot};
