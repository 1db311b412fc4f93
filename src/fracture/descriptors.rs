//! Plain-data fracture descriptors.
//!
//! Descriptors carry no behavior: each is validated by a single predicate
//! and consumed by the matching split function.

use crate::math::Real;

/// Procedural noise applied to slice planes.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct NoiseParameters {
    /// Size of the fluctuations, relative to mesh size.
    pub amplitude: Real,
    /// Noise frequency, relative to the inverse mesh size. On scales much
    /// smaller the function is smooth; on scales much larger it looks
    /// uncorrelated.
    pub frequency: Real,
    /// How many superposed sinusoidal modes to generate. Frequencies are
    /// randomly chosen in a band around `frequency`, in random directions.
    pub mode_count: u32,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        NoiseParameters {
            amplitude: 0.0,
            frequency: 0.25,
            mode_count: 8,
        }
    }
}

impl NoiseParameters {
    /// Whether these parameters describe a usable noise function.
    pub fn validate(&self) -> bool {
        self.amplitude >= 0.0 && self.amplitude.is_finite() && self.frequency > 0.0
    }
}

/// Which axis order slice planes cycle through.
///
/// This only matters if there is randomness in the slice surfaces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum SliceOrder {
    /// X, then Y, then Z.
    Xyz,
    /// Y, then Z, then X.
    Yzx,
    /// Z, then X, then Y.
    Zxy,
    /// Z, then Y, then X.
    Zyx,
    /// Y, then X, then Z.
    Yxz,
    /// X, then Z, then Y.
    Xzy,
}

impl SliceOrder {
    /// The coordinate axes in slicing order.
    pub fn axes(self) -> [usize; 3] {
        match self {
            SliceOrder::Xyz => [0, 1, 2],
            SliceOrder::Yzx => [1, 2, 0],
            SliceOrder::Zxy => [2, 0, 1],
            SliceOrder::Zyx => [2, 1, 0],
            SliceOrder::Yxz => [1, 0, 2],
            SliceOrder::Xzy => [0, 2, 1],
        }
    }
}

/// Descriptor for slice-mode fracturing.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SliceDesc {
    /// How many slicing planes to generate. Up to `2^num_slices` pieces
    /// result; fewer when fragments degenerate.
    pub num_slices: u32,
    /// The axis order the planes cycle through.
    pub order: SliceOrder,
    /// Variation in slice position along each axis, as a fraction of the
    /// even inter-slice spacing. 0 means evenly spaced planes.
    pub linear_variation: Real,
    /// Variation of the slice surface angle away from its axis, in radians.
    pub angular_variation: Real,
    /// Procedural perturbation of each slicing plane.
    pub noise: NoiseParameters,
    /// Sub-mesh tag assigned to the cut faces.
    pub interior_submesh: u32,
}

impl Default for SliceDesc {
    fn default() -> Self {
        SliceDesc {
            num_slices: 3,
            order: SliceOrder::Xyz,
            linear_variation: 0.1,
            angular_variation: 20.0 * std::f64::consts::PI as Real / 180.0,
            noise: NoiseParameters::default(),
            interior_submesh: 0,
        }
    }
}

impl SliceDesc {
    /// Whether this descriptor describes a feasible slice operation.
    pub fn validate(&self) -> bool {
        self.num_slices >= 1
            && self.num_slices <= 20
            && self.linear_variation >= 0.0
            && self.linear_variation <= 1.0
            && self.angular_variation >= 0.0
            && self.angular_variation < std::f64::consts::FRAC_PI_2 as Real
            && self.noise.validate()
    }
}

/// Descriptor for Voronoi-mode fracturing.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct VoronoiDesc {
    /// How many interior sites to sample; one cell results per site.
    pub site_count: u32,
    /// Each cell is built from the bisector planes of at most this many
    /// nearest sites. Raising it trades speed for exactness on dense site
    /// sets.
    pub max_neighbors: u32,
    /// Bound on rejection-sampling attempts per site.
    pub max_site_attempts: u32,
    /// Sub-mesh tag assigned to the cut faces.
    pub interior_submesh: u32,
}

impl Default for VoronoiDesc {
    fn default() -> Self {
        VoronoiDesc {
            site_count: 16,
            max_neighbors: 24,
            max_site_attempts: 1024,
            interior_submesh: 0,
        }
    }
}

impl VoronoiDesc {
    /// Whether this descriptor describes a feasible Voronoi operation.
    pub fn validate(&self) -> bool {
        self.site_count >= 1 && self.max_neighbors >= 1 && self.max_site_attempts >= 1
    }
}

/// Descriptor for cutout-mode (chippable) fracturing.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CutoutDesc {
    /// Extrusion depth of the cutout solid, relative to the mesh
    /// bounding-box diagonal. Non-positive cuts all the way through.
    pub depth: Real,
    /// Sub-mesh tag assigned to the cut faces.
    pub interior_submesh: u32,
}

impl Default for CutoutDesc {
    fn default() -> Self {
        CutoutDesc {
            depth: 0.0,
            interior_submesh: 0,
        }
    }
}

impl CutoutDesc {
    /// Whether this descriptor describes a feasible cutout operation.
    pub fn validate(&self) -> bool {
        self.depth.is_finite()
    }
}
