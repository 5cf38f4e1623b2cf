//! Node id to datacube id mapping.
//!
//! The engine uses small ids for its own picking objects, so datacubes are
//! numbered from the top of the `u32` range down: `datacube = u32::MAX - node`.
//! Node ids are capped at [`NodeId::MAX`], which keeps every datacube id at
//! or above `2^31`.

use crate::graph::id::{DatacubeId, NodeId};

pub struct DatacubeIdCodec;

impl DatacubeIdCodec {
    pub const MAX_NODE_ID: NodeId = NodeId::MAX;

    /// Smallest id in the datacube range.
    pub const FIRST_DATACUBE_ID: DatacubeId = DatacubeId(u32::MAX - NodeId::MAX.0);

    /// `None` for ids outside `0..=MAX_NODE_ID`.
    pub fn encode(id: NodeId) -> Option<DatacubeId> {
        id.is_valid().then(|| DatacubeId(u32::MAX - id.0))
    }

    /// `None` for ids the engine owns.
    pub fn decode(id: DatacubeId) -> Option<NodeId> {
        Self::is_datacube_id(id).then(|| NodeId(u32::MAX - id.0))
    }

    pub fn is_datacube_id(id: DatacubeId) -> bool {
        id >= Self::FIRST_DATACUBE_ID
    }
}
