use crate::bounding_volume::Aabb;
use crate::math::Real;

/// The tolerance bundle used by the geometry kernel.
///
/// All linear tolerances are derived from the bounding-box diagonal of the
/// mesh being processed, which makes every kernel operation scale-invariant:
/// fracturing a centimeter-sized prop and a hundred-meter building behaves
/// identically up to scale.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Tolerances {
    /// Linear tolerance for point/plane classification.
    pub linear: Real,
    /// Angular tolerance (radians) for plane and normal comparisons.
    pub angular: Real,
    /// Tolerance under which edge/plane intersections snap to existing
    /// vertices during clipping, so slivers are not produced.
    pub clip: Real,
    /// Welding tolerance used when reconstructing a mesh from a BSP tree.
    pub cleaning: Real,
    /// Fragments with volume below this value are discarded as degenerate.
    pub degenerate_volume: Real,
}

impl Tolerances {
    /// Tolerances for a mesh with the given bounding-box diagonal length.
    pub fn for_diagonal(diagonal: Real) -> Self {
        let diagonal = diagonal.max(crate::math::DEFAULT_EPSILON);
        Tolerances {
            linear: diagonal * 1.0e-6,
            angular: 1.0e-4,
            clip: diagonal * 1.0e-5,
            cleaning: diagonal * 1.0e-5,
            degenerate_volume: diagonal * diagonal * diagonal * 1.0e-9,
        }
    }

    /// Tolerances for a mesh with the given bounding box.
    pub fn for_aabb(aabb: &Aabb) -> Self {
        Self::for_diagonal(aabb.diagonal_length())
    }
}
