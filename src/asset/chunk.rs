use crate::bounding_volume::Aabb;
use crate::math::{Real, Vector};
use crate::shape::ConvexHull;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
/// Per-chunk behavior flags.
pub struct ChunkFlags(u8);

bitflags::bitflags! {
    impl ChunkFlags: u8 {
        /// The chunk participates in structural-support analysis.
        const SUPPORT = 1;
        /// The chunk is never fractured further at runtime.
        const DO_NOT_FRACTURE = 1 << 1;
        /// The chunk takes no damage.
        const DO_NOT_DAMAGE = 1 << 2;
        /// The chunk never crumbles into debris.
        const DO_NOT_CRUMBLE = 1 << 3;
        /// The chunk reuses another chunk's geometry part with an offset.
        const INSTANCED = 1 << 4;
    }
}

/// One node of the fracture hierarchy.
///
/// Chunks are created only by authoring-time cook/split operations; runtime
/// consumers read the topology and never mutate it.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Chunk {
    /// Hierarchy depth; 0 only for the unique root.
    pub depth: u32,
    /// Index of the parent chunk, or -1 for the root.
    pub parent: i32,
    /// Indices of the child chunks, in creation order.
    pub children: Vec<u32>,
    /// Index of this chunk's geometry part.
    pub part_index: u32,
    /// Behavior flags.
    pub flags: ChunkFlags,
    /// Index into the registry's behavior groups, or -1 for the asset
    /// default.
    pub behavior_group: i32,
    /// Chunk bounds in asset-local space.
    pub bounds: Aabb,
    /// Position offset of an instanced chunk relative to its part.
    pub instance_offset: Option<Vector<Real>>,
    /// UV offset applied to an instanced chunk's render geometry.
    pub instance_uv_offset: Option<[Real; 2]>,
}

impl Chunk {
    /// Whether this chunk is the hierarchy root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent < 0
    }
}

/// The cooked geometry shared by one or more chunks: collision hulls plus a
/// render sub-mesh reference.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ChunkPart {
    /// The convex collision volumes; never empty once cooked.
    pub hulls: Vec<ConvexHull>,
    /// Index of the render mesh in the asset's mesh table.
    pub render_mesh: u32,
}
