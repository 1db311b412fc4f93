use crate::bounding_volume::Aabb;
use crate::csg::GeometryError;
use crate::math::{Point, Real, Vector};
use crate::shape::Plane;
use crate::utils::hashmap::HashMap;
use crate::utils::SortedPair;

/// Computes the convex hull of a set of 3D points.
///
/// Returns the hull vertices and its triangle index buffer, with triangles
/// wound counter-clock-wise seen from the outside.
///
/// # Errors
/// - [`GeometryError::IncompleteInput`] if fewer than 4 points are given.
/// - [`GeometryError::MissingSupportPoint`] if the points are invalid (NaN)
///   or almost coplanar.
pub fn try_convex_hull(
    points: &[Point<Real>],
) -> Result<(Vec<Point<Real>>, Vec<[u32; 3]>), GeometryError> {
    if points.len() < 4 {
        return Err(GeometryError::IncompleteInput);
    }

    let aabb = Aabb::from_points(points.iter());
    let eps = aabb.diagonal_length().max(crate::math::DEFAULT_EPSILON) * 1.0e-6;

    // Duplicate points break the horizon walk; keep first occurrences only.
    let mut deduped: Vec<Point<Real>> = Vec::with_capacity(points.len());
    for pt in points {
        if !deduped.iter().any(|p| na::distance(p, pt) <= eps) {
            deduped.push(*pt);
        }
    }
    let points = &deduped[..];
    if points.len() < 4 {
        return Err(GeometryError::MissingSupportPoint);
    }

    let [i0, i1, i2, i3] = initial_tetrahedron(points, eps)?;

    // Faces of the initial tetrahedron, oriented outward.
    let mut faces: Vec<Face> = Vec::new();
    let centroid = na::center(
        &na::center(&points[i0], &points[i1]),
        &na::center(&points[i2], &points[i3]),
    );
    for tri in [[i0, i1, i2], [i0, i1, i3], [i0, i2, i3], [i1, i2, i3]] {
        faces.push(Face::new_outward(points, tri, &centroid)?);
    }

    for (pid, point) in points.iter().enumerate() {
        if [i0, i1, i2, i3].contains(&pid) {
            continue;
        }

        // Faces the candidate point can see. A point outside the hull by
        // more than `eps` is strictly visible to at least one face; points
        // within `eps` of the surface are absorbed.
        let mut visible = Vec::new();
        for (fid, face) in faces.iter().enumerate() {
            if face.alive && face.plane.signed_distance(point) > eps {
                visible.push(fid);
            }
        }

        if visible.is_empty() {
            continue;
        }

        // The horizon is the set of edges adjacent to exactly one visible face.
        let mut edge_count: HashMap<SortedPair<u32>, u32> = HashMap::new();
        for &fid in &visible {
            let [a, b, c] = faces[fid].indices;
            for (e0, e1) in [(a, b), (b, c), (c, a)] {
                *edge_count.entry(SortedPair::new(e0, e1)).or_insert(0) += 1;
            }
        }

        // Walk the visible faces again (not the map, whose order is not
        // deterministic) so the output face order only depends on the input.
        for &fid in &visible {
            let [a, b, c] = faces[fid].indices;
            for (e0, e1) in [(a, b), (b, c), (c, a)] {
                if edge_count[&SortedPair::new(e0, e1)] == 1 {
                    match Face::new_outward(points, [e0 as usize, e1 as usize, pid], &centroid) {
                        Ok(face) => faces.push(face),
                        // The point is collinear with this horizon edge; the
                        // neighboring patch faces cover the edge.
                        Err(_) => log::debug!("Skipping a degenerate horizon face."),
                    }
                }
            }
        }

        for &fid in &visible {
            faces[fid].alive = false;
        }
    }

    // Compact the surviving faces into a standalone vertex/index buffer.
    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for face in faces.iter().filter(|f| f.alive) {
        let mut tri = [0u32; 3];
        for (k, &src) in face.indices.iter().enumerate() {
            let next = vertices.len() as u32;
            let id = *remap.entry(src).or_insert_with(|| {
                vertices.push(points[src as usize]);
                next
            });
            tri[k] = id;
        }
        indices.push(tri);
    }

    Ok((vertices, indices))
}

struct Face {
    indices: [u32; 3],
    plane: Plane,
    alive: bool,
}

impl Face {
    fn new_outward(
        points: &[Point<Real>],
        tri: [usize; 3],
        interior: &Point<Real>,
    ) -> Result<Face, GeometryError> {
        let [a, b, c] = tri;
        let (tri, plane) =
            match Plane::from_triangle(&points[a], &points[b], &points[c]) {
                Some(plane) if plane.signed_distance(interior) <= 0.0 => {
                    ([a as u32, b as u32, c as u32], plane)
                }
                _ => {
                    let plane = Plane::from_triangle(&points[a], &points[c], &points[b])
                        .ok_or(GeometryError::MissingSupportPoint)?;
                    ([a as u32, c as u32, b as u32], plane)
                }
            };
        Ok(Face {
            indices: tri,
            plane,
            alive: true,
        })
    }
}

// Picks four affinely independent points: two extremes along x, the point
// furthest from their line, then the point furthest from their plane.
fn initial_tetrahedron(points: &[Point<Real>], eps: Real) -> Result<[usize; 4], GeometryError> {
    let mut i0 = 0;
    let mut i1 = 0;
    for (i, p) in points.iter().enumerate() {
        if !p.coords.iter().all(|x| x.is_finite()) {
            return Err(GeometryError::MissingSupportPoint);
        }
        if p.x < points[i0].x {
            i0 = i;
        }
        if p.x > points[i1].x {
            i1 = i;
        }
    }
    if na::distance(&points[i0], &points[i1]) <= eps {
        // Degenerate along x; fall back to a pairwise search.
        'outer: for i in 0..points.len() {
            for j in i + 1..points.len() {
                if na::distance(&points[i], &points[j]) > eps {
                    i0 = i;
                    i1 = j;
                    break 'outer;
                }
            }
        }
        if na::distance(&points[i0], &points[i1]) <= eps {
            return Err(GeometryError::MissingSupportPoint);
        }
    }

    let dir = (points[i1] - points[i0]).normalize();
    let mut i2 = usize::MAX;
    let mut best = eps;
    for (i, p) in points.iter().enumerate() {
        let to_p = p - points[i0];
        let dist = (to_p - dir * to_p.dot(&dir)).norm();
        if dist > best {
            best = dist;
            i2 = i;
        }
    }
    if i2 == usize::MAX {
        return Err(GeometryError::MissingSupportPoint);
    }

    let plane = Plane::from_triangle(&points[i0], &points[i1], &points[i2])
        .ok_or(GeometryError::MissingSupportPoint)?;
    let mut i3 = usize::MAX;
    let mut best = eps;
    for (i, p) in points.iter().enumerate() {
        let dist = plane.signed_distance(p).abs();
        if dist > best {
            best = dist;
            i3 = i;
        }
    }
    if i3 == usize::MAX {
        return Err(GeometryError::MissingSupportPoint);
    }

    Ok([i0, i1, i2, i3])
}

/// A convex collision volume cooked for one chunk part.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ConvexHull {
    vertices: Vec<Point<Real>>,
    indices: Vec<[u32; 3]>,
}

impl ConvexHull {
    /// Cooks the convex hull of a point cloud.
    pub fn from_points(points: &[Point<Real>]) -> Result<Self, GeometryError> {
        let (vertices, indices) = try_convex_hull(points)?;
        Ok(ConvexHull { vertices, indices })
    }

    /// Assembles a hull from buffers already known to describe one, e.g.
    /// when rescaling an existing hull (scaling preserves convexity).
    pub fn from_parts_unchecked(vertices: Vec<Point<Real>>, indices: Vec<[u32; 3]>) -> Self {
        ConvexHull { vertices, indices }
    }

    /// The hull vertices.
    #[inline]
    pub fn vertices(&self) -> &[Point<Real>] {
        &self.vertices
    }

    /// The hull triangle indices.
    #[inline]
    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    /// The outward face planes of this hull, one per triangle.
    pub fn face_planes(&self) -> impl Iterator<Item = Plane> + '_ {
        self.indices.iter().filter_map(move |idx| {
            Plane::from_triangle(
                &self.vertices[idx[0] as usize],
                &self.vertices[idx[1] as usize],
                &self.vertices[idx[2] as usize],
            )
        })
    }

    /// The axis-aligned bounding box of this hull.
    pub fn compute_aabb(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter())
    }

    /// The hull's barycenter.
    pub fn center(&self) -> Point<Real> {
        let mut acc = Vector::zeros();
        for pt in &self.vertices {
            acc += pt.coords;
        }
        Point::from(acc / self.vertices.len().max(1) as Real)
    }

    /// The radius of the bounding sphere centered at [`Self::center`].
    pub fn bounding_radius(&self) -> Real {
        let center = self.center();
        self.vertices
            .iter()
            .map(|p| na::distance(p, &center))
            .fold(0.0, Real::max)
    }

    /// The volume enclosed by this hull.
    pub fn volume(&self) -> Real {
        let mut volume = 0.0;
        for idx in &self.indices {
            let a = self.vertices[idx[0] as usize].coords;
            let b = self.vertices[idx[1] as usize].coords;
            let c = self.vertices[idx[2] as usize].coords;
            volume += a.cross(&b).dot(&c);
        }
        (volume / 6.0).abs()
    }

    /// The extent of this hull projected on `axis`.
    pub fn project_on_axis(&self, axis: &Vector<Real>) -> (Real, Real) {
        let mut min = Real::MAX;
        let mut max = -Real::MAX;
        for pt in &self.vertices {
            let d = pt.coords.dot(axis);
            min = min.min(d);
            max = max.max(d);
        }
        (min, max)
    }

    /// Tests whether this hull, inflated by `padding`, intersects `other`.
    ///
    /// Separating-axis test over both hulls' face normals, preceded by a
    /// bounding-sphere reject. The face-normal axis set may report touching
    /// slightly early for edge-edge configurations, never the converse; with
    /// the neighbor padding inflation this is the conservative direction.
    pub fn intersects_padded(&self, other: &ConvexHull, padding: Real) -> bool {
        let dist = na::distance(&self.center(), &other.center());
        if dist > self.bounding_radius() + other.bounding_radius() + padding {
            return false;
        }

        for plane in self.face_planes().chain(other.face_planes()) {
            let (min_a, max_a) = self.project_on_axis(&plane.normal);
            let (min_b, max_b) = other.project_on_axis(&plane.normal);
            if min_a > max_b + padding || min_b > max_a + padding {
                return false;
            }
        }

        true
    }

    /// Clips this hull by the negative half-space of `plane` and re-cooks it.
    ///
    /// Vertices on the positive side are replaced by the intersections of the
    /// crossing edges with the plane. Returns `None` if the clipped hull
    /// degenerates.
    pub fn clipped(&self, plane: &Plane) -> Option<ConvexHull> {
        let mut kept: Vec<Point<Real>> = Vec::new();
        for pt in &self.vertices {
            if plane.signed_distance(pt) <= 0.0 {
                kept.push(*pt);
            }
        }
        if kept.len() == self.vertices.len() {
            return Some(self.clone());
        }

        let mut seen: HashMap<SortedPair<u32>, ()> = HashMap::new();
        for idx in &self.indices {
            for (a, b) in [(idx[0], idx[1]), (idx[1], idx[2]), (idx[2], idx[0])] {
                if seen.insert(SortedPair::new(a, b), ()).is_some() {
                    continue;
                }
                let pa = self.vertices[a as usize];
                let pb = self.vertices[b as usize];
                let da = plane.signed_distance(&pa);
                let db = plane.signed_distance(&pb);
                if (da > 0.0) != (db > 0.0) {
                    let t = da / (da - db);
                    kept.push(pa + (pb - pa) * t);
                }
            }
        }

        ConvexHull::from_points(&kept).ok()
    }
}
