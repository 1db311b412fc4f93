use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, Vector};
use crate::utils::hashmap::{Entry, HashMap};
use crate::utils::remove_unused_points;

/// An explicit-triangle buffer with per-triangle sub-mesh (material) tags.
///
/// This is the mesh representation every stage of the fracture pipeline works
/// on: triangles are stored explicitly (no adjacency), in a stable order, and
/// each carries the index of the render sub-mesh it belongs to. Cut faces
/// introduced by the planner are tagged with an interior sub-mesh index so
/// authoring tools can assign them a different material.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FractureMesh {
    vertices: Vec<Point<Real>>,
    indices: Vec<[u32; 3]>,
    submeshes: Vec<u32>,
}

impl FractureMesh {
    /// Creates a mesh with one sub-mesh tag per triangle.
    ///
    /// Panics if `indices` and `submeshes` have different lengths.
    pub fn new(vertices: Vec<Point<Real>>, indices: Vec<[u32; 3]>, submeshes: Vec<u32>) -> Self {
        assert_eq!(
            indices.len(),
            submeshes.len(),
            "A fracture mesh needs exactly one sub-mesh tag per triangle."
        );
        FractureMesh {
            vertices,
            indices,
            submeshes,
        }
    }

    /// Creates a mesh with every triangle tagged with sub-mesh 0.
    pub fn with_uniform_submesh(vertices: Vec<Point<Real>>, indices: Vec<[u32; 3]>) -> Self {
        let submeshes = vec![0; indices.len()];
        Self::new(vertices, indices, submeshes)
    }

    /// An empty mesh.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The vertex buffer.
    #[inline]
    pub fn vertices(&self) -> &[Point<Real>] {
        &self.vertices
    }

    /// The index buffer.
    #[inline]
    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    /// The per-triangle sub-mesh tags.
    #[inline]
    pub fn submeshes(&self) -> &[u32] {
        &self.submeshes
    }

    /// The number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// The three corners of the `i`-th triangle.
    #[inline]
    pub fn triangle(&self, i: usize) -> [Point<Real>; 3] {
        let idx = self.indices[i];
        [
            self.vertices[idx[0] as usize],
            self.vertices[idx[1] as usize],
            self.vertices[idx[2] as usize],
        ]
    }

    /// The area of the `i`-th triangle.
    #[inline]
    pub fn triangle_area(&self, i: usize) -> Real {
        let [a, b, c] = self.triangle(i);
        (b - a).cross(&(c - a)).norm() * 0.5
    }

    /// The axis-aligned bounding box of this mesh.
    pub fn compute_aabb(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter())
    }

    /// The signed volume enclosed by this mesh.
    ///
    /// Only meaningful if the mesh is closed, with triangles wound
    /// counter-clock-wise seen from the outside.
    pub fn signed_volume(&self) -> Real {
        let mut volume = 0.0;
        for idx in &self.indices {
            let a = self.vertices[idx[0] as usize].coords;
            let b = self.vertices[idx[1] as usize].coords;
            let c = self.vertices[idx[2] as usize].coords;
            volume += a.cross(&b).dot(&c);
        }
        volume / 6.0
    }

    /// Appends all of `other`'s triangles to `self`, keeping sub-mesh tags.
    pub fn append(&mut self, other: &FractureMesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices
            .extend(other.indices.iter().map(|idx| [idx[0] + base, idx[1] + base, idx[2] + base]));
        self.submeshes.extend_from_slice(&other.submeshes);
    }

    /// Adds one triangle.
    pub fn push_triangle(&mut self, pts: [Point<Real>; 3], submesh: u32) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&pts);
        self.indices.push([base, base + 1, base + 2]);
        self.submeshes.push(submesh);
    }

    /// Welds vertices closer than `tolerance` and drops the triangles this
    /// collapses, then removes unused vertices.
    ///
    /// Welding snaps each vertex to the first vertex found in the same
    /// quantization cell, so the result only depends on vertex order.
    pub fn weld_vertices(&mut self, tolerance: Real) {
        let inv_cell = 1.0 / tolerance.max(crate::math::DEFAULT_EPSILON);
        let mut cells: HashMap<[i64; 3], Vec<u32>> = HashMap::new();
        let mut remap: Vec<u32> = Vec::with_capacity(self.vertices.len());

        for (i, pt) in self.vertices.iter().enumerate() {
            let key = [
                (pt.x * inv_cell).round() as i64,
                (pt.y * inv_cell).round() as i64,
                (pt.z * inv_cell).round() as i64,
            ];

            let mut target = i as u32;
            // Look at the cell and its neighbors so near-duplicates crossing a
            // cell boundary still merge.
            'search: for dx in -1..=1i64 {
                for dy in -1..=1i64 {
                    for dz in -1..=1i64 {
                        let neighbor = [key[0] + dx, key[1] + dy, key[2] + dz];
                        if let Some(candidates) = cells.get(&neighbor) {
                            for &c in candidates {
                                if na::distance(&self.vertices[c as usize], pt) <= tolerance {
                                    target = c;
                                    break 'search;
                                }
                            }
                        }
                    }
                }
            }

            if target == i as u32 {
                match cells.entry(key) {
                    Entry::Occupied(mut e) => e.get_mut().push(i as u32),
                    Entry::Vacant(e) => {
                        let _ = e.insert(vec![i as u32]);
                    }
                }
            }
            remap.push(target);
        }

        let mut new_indices = Vec::with_capacity(self.indices.len());
        let mut new_submeshes = Vec::with_capacity(self.submeshes.len());
        for (idx, &sub) in self.indices.iter().zip(self.submeshes.iter()) {
            let mapped = [
                remap[idx[0] as usize],
                remap[idx[1] as usize],
                remap[idx[2] as usize],
            ];
            if mapped[0] != mapped[1] && mapped[1] != mapped[2] && mapped[2] != mapped[0] {
                new_indices.push(mapped);
                new_submeshes.push(sub);
            }
        }

        self.indices = new_indices;
        self.submeshes = new_submeshes;
        remove_unused_points(&mut self.vertices, &mut self.indices);
    }

    /// Drops every triangle with area below `tolerance`.
    pub fn remove_degenerate_triangles(&mut self, tolerance: Real) {
        let mut kept_indices = Vec::with_capacity(self.indices.len());
        let mut kept_submeshes = Vec::with_capacity(self.submeshes.len());
        for i in 0..self.indices.len() {
            if self.triangle_area(i) > tolerance {
                kept_indices.push(self.indices[i]);
                kept_submeshes.push(self.submeshes[i]);
            }
        }
        self.indices = kept_indices;
        self.submeshes = kept_submeshes;
        remove_unused_points(&mut self.vertices, &mut self.indices);
    }

    /// Removes pairs of coincident triangles with opposite winding.
    ///
    /// Appending fragments that were split apart re-creates their shared cut
    /// faces as back-to-back duplicates; once vertices are welded those pairs
    /// are internal walls and cancel exactly.
    pub fn cancel_paired_faces(&mut self) {
        let mut groups: HashMap<[u32; 3], Vec<(usize, bool)>> = HashMap::new();
        for (i, idx) in self.indices.iter().enumerate() {
            let mut sorted = *idx;
            let mut swaps = 0u32;
            for a in 0..2 {
                for b in 0..2 - a {
                    if sorted[b] > sorted[b + 1] {
                        sorted.swap(b, b + 1);
                        swaps += 1;
                    }
                }
            }
            groups.entry(sorted).or_default().push((i, swaps % 2 == 0));
        }

        let mut removed = vec![false; self.indices.len()];
        for (_, group) in groups.iter() {
            let mut even: Vec<usize> = Vec::new();
            let mut odd: Vec<usize> = Vec::new();
            for &(i, parity) in group {
                if parity {
                    even.push(i);
                } else {
                    odd.push(i);
                }
            }
            for (&a, &b) in even.iter().zip(odd.iter()) {
                removed[a] = true;
                removed[b] = true;
            }
        }

        let mut new_indices = Vec::with_capacity(self.indices.len());
        let mut new_submeshes = Vec::with_capacity(self.submeshes.len());
        for i in 0..self.indices.len() {
            if !removed[i] {
                new_indices.push(self.indices[i]);
                new_submeshes.push(self.submeshes[i]);
            }
        }
        self.indices = new_indices;
        self.submeshes = new_submeshes;
        remove_unused_points(&mut self.vertices, &mut self.indices);
    }

    /// Partitions this mesh into its connected components.
    ///
    /// Two triangles are connected if they share a vertex index. Components
    /// are returned in the order of their lowest triangle index, so the
    /// partition is stable.
    pub fn split_islands(&self) -> Vec<FractureMesh> {
        use ena::unify::{InPlaceUnificationTable, UnifyKey};

        #[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
        struct IntKey(u32);

        impl UnifyKey for IntKey {
            type Value = ();
            fn index(&self) -> u32 {
                self.0
            }
            fn from_index(u: u32) -> IntKey {
                IntKey(u)
            }
            fn tag() -> &'static str {
                "IntKey"
            }
        }

        if self.indices.is_empty() {
            return Vec::new();
        }

        let mut ufind: InPlaceUnificationTable<IntKey> = InPlaceUnificationTable::new();
        for _ in 0..self.vertices.len() {
            let _ = ufind.new_key(());
        }

        for idx in &self.indices {
            ufind.union(IntKey(idx[0]), IntKey(idx[1]));
            ufind.union(IntKey(idx[1]), IntKey(idx[2]));
        }

        // Group triangles by their root key, keeping first-seen order.
        let mut root_to_island: HashMap<u32, usize> = HashMap::new();
        let mut islands: Vec<FractureMesh> = Vec::new();

        for (idx, &sub) in self.indices.iter().zip(self.submeshes.iter()) {
            let root = ufind.find(IntKey(idx[0])).0;
            let island_id = match root_to_island.entry(root) {
                Entry::Occupied(e) => *e.get(),
                Entry::Vacant(e) => {
                    let _ = e.insert(islands.len());
                    islands.push(FractureMesh::empty());
                    islands.len() - 1
                }
            };
            islands[island_id].push_triangle(
                [
                    self.vertices[idx[0] as usize],
                    self.vertices[idx[1] as usize],
                    self.vertices[idx[2] as usize],
                ],
                sub,
            );
        }

        for island in &mut islands {
            island.weld_vertices(crate::math::DEFAULT_EPSILON);
        }

        islands
    }

    /// Tests whether `point` lies inside this (closed) mesh with an
    /// odd-crossing ray parity test.
    ///
    /// The ray direction is fixed and irrational-ish so axis-aligned input
    /// geometry does not produce edge-grazing hits.
    pub fn contains_point(&self, point: &Point<Real>) -> bool {
        let dir = Vector::new(0.577_350_3, 0.211_324_9, 0.788_675_1);
        let mut crossings = 0usize;

        for i in 0..self.indices.len() {
            let [a, b, c] = self.triangle(i);
            if ray_hits_triangle(point, &dir, &a, &b, &c) {
                crossings += 1;
            }
        }

        crossings % 2 == 1
    }
}

// Möller–Trumbore, counting strictly positive hits only.
fn ray_hits_triangle(
    orig: &Point<Real>,
    dir: &Vector<Real>,
    a: &Point<Real>,
    b: &Point<Real>,
    c: &Point<Real>,
) -> bool {
    let ab = b - a;
    let ac = c - a;
    let pvec = dir.cross(&ac);
    let det = ab.dot(&pvec);

    if det.abs() < 1.0e-12 {
        return false;
    }

    let inv_det = 1.0 / det;
    let tvec = orig - a;
    let u = tvec.dot(&pvec) * inv_det;
    if u < 0.0 || u > 1.0 {
        return false;
    }

    let qvec = tvec.cross(&ab);
    let v = dir.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    ac.dot(&qvec) * inv_det > 1.0e-12
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point;

    pub(crate) fn unit_cube() -> FractureMesh {
        // A 2x2x2 cube centered at the origin, CCW winding seen from outside.
        let vertices = vec![
            Point::new(-1.0, -1.0, -1.0),
            Point::new(1.0, -1.0, -1.0),
            Point::new(1.0, 1.0, -1.0),
            Point::new(-1.0, 1.0, -1.0),
            Point::new(-1.0, -1.0, 1.0),
            Point::new(1.0, -1.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
            Point::new(-1.0, 1.0, 1.0),
        ];
        let indices = vec![
            [0u32, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ];
        FractureMesh::with_uniform_submesh(vertices, indices)
    }

    #[test]
    fn cube_volume() {
        assert_relative_eq!(unit_cube().signed_volume(), 8.0, epsilon = 1.0e-5);
    }

    #[test]
    fn cube_contains_center_but_not_outside() {
        let cube = unit_cube();
        assert!(cube.contains_point(&Point::new(0.0, 0.0, 0.0)));
        assert!(cube.contains_point(&Point::new(0.9, -0.9, 0.5)));
        assert!(!cube.contains_point(&Point::new(1.5, 0.0, 0.0)));
        assert!(!cube.contains_point(&Point::new(0.0, -3.0, 0.0)));
    }

    #[test]
    fn welding_merges_duplicated_corners() {
        let mut soup = FractureMesh::empty();
        let cube = unit_cube();
        for i in 0..cube.num_triangles() {
            soup.push_triangle(cube.triangle(i), 0);
        }
        assert_eq!(soup.vertices().len(), 36);

        soup.weld_vertices(1.0e-5);
        assert_eq!(soup.vertices().len(), 8);
        assert_eq!(soup.num_triangles(), 12);
        assert_relative_eq!(soup.signed_volume(), 8.0, epsilon = 1.0e-5);
    }

    #[test]
    fn islands_of_two_disjoint_cubes() {
        let mut mesh = unit_cube();
        let far = unit_cube();
        let shifted: Vec<_> = far
            .vertices()
            .iter()
            .map(|p| Point::new(p.x + 10.0, p.y, p.z))
            .collect();
        let far = FractureMesh::with_uniform_submesh(shifted, far.indices().to_vec());
        mesh.append(&far);

        let islands = mesh.split_islands();
        assert_eq!(islands.len(), 2);
        for island in &islands {
            assert_relative_eq!(island.signed_volume(), 8.0, epsilon = 1.0e-5);
        }
    }
}
