//! The fracture planner: slice, Voronoi and cutout splitting of one mesh
//! into child meshes.

pub use self::cutout::{cutout_split, Cutout, CutoutSet};
pub use self::descriptors::{CutoutDesc, NoiseParameters, SliceDesc, SliceOrder, VoronoiDesc};
pub use self::noise::SurfaceNoise;
pub use self::progress::{CancelFlag, NullProgress, Progress, ProgressListener};
pub use self::slice::slice_split;
pub use self::voronoi::voronoi_split;

mod cutout;
mod descriptors;
mod noise;
mod progress;
mod slice;
mod voronoi;

use crate::shape::FractureMesh;

/// The outcome of a fracture operation.
///
/// Cancellation is not an error: the operation simply reports that it did not
/// complete, and the parent mesh is left untouched.
pub enum SplitOutput {
    /// The split ran to completion.
    Completed {
        /// The child meshes, in generation order.
        pieces: Vec<FractureMesh>,
        /// How many degenerate fragments were discarded along the way.
        discarded: u32,
    },
    /// The cooperative cancel flag was raised between clip steps.
    Cancelled,
}
