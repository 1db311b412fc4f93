//! Shapes handled by the fracture pipeline: triangle buffers, splitting
//! planes, and convex collision hulls.

pub use self::convex_hull::{try_convex_hull, ConvexHull};
pub use self::fracture_mesh::FractureMesh;
pub use self::plane::{Plane, PlaneSide};

mod convex_hull;
mod fracture_mesh;
mod plane;
