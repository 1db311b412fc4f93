//! The CSG/BSP geometry kernel: plane classification, mesh clipping, and
//! tree-to-mesh reconstruction.

pub use self::bsp::{Bsp, BspBuildParams, BspNode};
pub use self::clip::{split_mesh, SplitOutcome};
pub use self::tolerance::Tolerances;

mod bsp;
mod clip;
mod reconstruct;
mod tolerance;

/// Errors that can occur in the geometry kernel.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// The input mesh contains no geometry above the degeneracy tolerance.
    #[error("the input mesh is degenerate: no triangle area above tolerance")]
    DegenerateInput,
    /// Less than 4 points were given to the convex-hull algorithm.
    #[error("less than 4 points were given to the convex-hull algorithm")]
    IncompleteInput,
    /// Input points are either invalid (NaN) or almost coplanar.
    #[error("input points are either invalid (NaN) or almost coplanar")]
    MissingSupportPoint,
    /// A point could not be classified against a splitting plane.
    #[error("point classification failed: non-finite coordinates")]
    FailedClassification,
    /// Every fragment produced by a split was below the volume tolerance.
    #[error("the split produced only zero-volume fragments")]
    ZeroVolumeFragments,
}
