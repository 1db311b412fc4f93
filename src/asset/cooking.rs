use crate::csg::GeometryError;
use crate::math::{Point, Real, UnitVector};
use crate::shape::{ConvexHull, FractureMesh, Plane};
use crate::utils::hashmap::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Supplies a convex decomposition for chunk meshes that are not close
/// enough to convex for a single hull.
///
/// The provider seam keeps decomposition backends (V-HACD and friends)
/// outside this crate; the default [`NoHullProvider`] makes the cooker fall
/// back to one hull per chunk.
pub trait HullProvider {
    /// Returns one point set per hull, or `None` to decline.
    fn decompose(&self, mesh: &FractureMesh) -> Option<Vec<Vec<Point<Real>>>>;
}

/// A provider that always declines.
pub struct NoHullProvider;

impl HullProvider for NoHullProvider {
    fn decompose(&self, _mesh: &FractureMesh) -> Option<Vec<Vec<Point<Real>>>> {
        None
    }
}

/// Parameters of collision-volume cooking.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CookParams {
    /// A chunk whose mesh volume is within this fraction of its hull volume
    /// is cooked as a single hull.
    pub near_convex_fraction: Real,
}

impl Default for CookParams {
    fn default() -> Self {
        CookParams {
            near_convex_fraction: 0.05,
        }
    }
}

/// Cooks the collision hulls of one chunk mesh.
///
/// Every cooked part has at least one hull: near-convex fragments get their
/// own hull, others get the provider's decomposition (hulls the provider
/// degenerates are skipped; if none survive, the single-hull fallback is
/// used).
pub fn cook_chunk_part(
    mesh: &FractureMesh,
    provider: &dyn HullProvider,
    params: &CookParams,
) -> Result<Vec<ConvexHull>, GeometryError> {
    let hull = ConvexHull::from_points(mesh.vertices())?;

    let mesh_volume = mesh.signed_volume().abs();
    let near_convex = mesh_volume >= hull.volume() * (1.0 - params.near_convex_fraction);
    if near_convex {
        return Ok(vec![hull]);
    }

    if let Some(point_sets) = provider.decompose(mesh) {
        #[cfg(feature = "parallel")]
        let cooked: Vec<ConvexHull> = point_sets
            .par_iter()
            .filter_map(|points| ConvexHull::from_points(points).ok())
            .collect();

        #[cfg(not(feature = "parallel"))]
        let cooked: Vec<ConvexHull> = point_sets
            .iter()
            .filter_map(|points| ConvexHull::from_points(points).ok())
            .collect();

        if !cooked.is_empty() {
            return Ok(cooked);
        }
        log::debug!("Every provider hull degenerated; falling back to a single hull.");
    }

    Ok(vec![hull])
}

/// Shrinks two overlapping sibling hulls along their shared trim plane.
///
/// The trim plane is the mid-plane between the hulls along their
/// center-to-center axis; each hull's clip distance is bounded by
/// `max_trim_fraction` of its extent on that axis, so trimming can reduce but
/// never hollow out a hull. Returns the replacement hulls (`None` entries
/// mean the hull was left untouched).
pub fn trim_hull_pair(
    hull_a: &ConvexHull,
    hull_b: &ConvexHull,
    max_trim_fraction: Real,
) -> (Option<ConvexHull>, Option<ConvexHull>) {
    let axis = hull_b.center() - hull_a.center();
    let Some(axis) = UnitVector::try_new(axis, crate::math::DEFAULT_EPSILON) else {
        return (None, None);
    };

    let (min_a, max_a) = hull_a.project_on_axis(&axis);
    let (min_b, max_b) = hull_b.project_on_axis(&axis);
    if max_a <= min_b {
        return (None, None);
    }

    let mid = (max_a + min_b) * 0.5;

    // Bound the clip distances so neither hull loses more than the fraction.
    let bias_a = mid.max(max_a - max_trim_fraction * (max_a - min_a));
    let bias_b = mid.min(min_b + max_trim_fraction * (max_b - min_b));

    let trimmed_a = if bias_a < max_a {
        hull_a.clipped(&Plane::new(axis, bias_a))
    } else {
        None
    };
    let trimmed_b = if bias_b > min_b {
        hull_b.clipped(&Plane::new(axis, bias_b).flipped())
    } else {
        None
    };

    (trimmed_a, trimmed_b)
}

/// An explicit cache of hulls rescaled for runtime actors, keyed by
/// `(part index, quantized scale)`.
///
/// The asset exclusively owns all hull data; runtime actors hold only the
/// key. Entries are created lazily and destroyed by explicit invalidation.
#[derive(Default)]
pub struct HullScaleCache {
    entries: HashMap<(u32, i64), Vec<ConvexHull>>,
}

impl HullScaleCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The hulls of `part` uniformly scaled by `scale`, building the entry
    /// on first use.
    pub fn hulls_at_scale(
        &mut self,
        part_hulls: &[ConvexHull],
        part: u32,
        scale: Real,
    ) -> &[ConvexHull] {
        let key = (part, quantize_scale(scale));
        self.entries.entry(key).or_insert_with(|| {
            part_hulls
                .iter()
                .map(|hull| {
                    let scaled: Vec<Point<Real>> =
                        hull.vertices().iter().map(|p| Point::from(p.coords * scale)).collect();
                    // Scaling preserves convexity, so the index buffer is
                    // reused as-is.
                    ConvexHull::from_parts_unchecked(scaled, hull.indices().to_vec())
                })
                .collect()
        })
    }

    /// Drops every cached scale of `part`.
    pub fn invalidate_part(&mut self, part: u32) {
        self.entries.retain(|(p, _), _| *p != part);
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn quantize_scale(scale: Real) -> i64 {
    (scale * 1.0e4) as i64
}
