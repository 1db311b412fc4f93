//! Various unsorted geometrical and logical operators.

pub use self::ccw_face_normal::ccw_face_normal;
pub use self::cleanup::remove_unused_points;
pub use self::rng::SeededRng;
pub use self::sorted_pair::SortedPair;

mod ccw_face_normal;
mod cleanup;
pub mod hashmap;
mod rng;
mod sorted_pair;
