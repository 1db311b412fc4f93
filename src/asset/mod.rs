//! The destructible asset: chunk hierarchy, cooked collision parts, and the
//! per-depth support-graph/overlap cache.

pub use self::asset::{
    AssetParameters, AssetStats, CookRegistry, DestructibleAsset, FractureReport, RenderMeshDesc,
};
pub use self::chunk::{Chunk, ChunkFlags, ChunkPart};
pub use self::cooking::{
    cook_chunk_part, trim_hull_pair, CookParams, HullProvider, HullScaleCache, NoHullProvider,
};
pub use self::hierarchy::{ChunkHierarchy, HierarchyError, MAX_CHUNK_COUNT};
pub use self::overlap_cache::{OverlapCache, OverlapCacheError};

mod asset;
mod chunk;
mod cooking;
mod hierarchy;
mod overlap_cache;

use crate::csg::GeometryError;

/// Errors surfaced by asset-level cook and fracture operations.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssetError {
    /// The geometry kernel failed.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),
    /// The chunk table refused a mutation.
    #[error("hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),
    /// The fracture descriptor failed its validation predicate.
    #[error("the fracture descriptor is invalid")]
    InvalidDescriptor,
}
