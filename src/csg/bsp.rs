use crate::csg::{GeometryError, Tolerances};
use crate::math::{Point, Real};
use crate::shape::{FractureMesh, Plane, PlaneSide};
use crate::utils::hashmap::HashMap;
use crate::utils::SeededRng;

/// Tunable constants of the BSP plane-selection heuristic.
///
/// These affect tree quality, not correctness; callers with pathological
/// content can substitute their own weights.
#[derive(Copy, Clone, Debug)]
pub struct BspBuildParams {
    /// How many randomly sampled candidate planes are scored at each node.
    pub test_set_size: usize,
    /// Weight of the number of triangles a candidate plane would split.
    pub split_weight: Real,
    /// Weight of the front/back triangle-count imbalance of a candidate.
    pub imbalance_weight: Real,
    /// A candidate whose log-area exceeds the candidate mean by more than
    /// this many standard deviations is selected unconditionally, which
    /// bounds tree degradation on meshes dominated by one large surface.
    /// Non-positive disables the test.
    pub log_area_sigma_threshold: Real,
    /// Maximum recursion depth. A node at this depth keeps its remaining
    /// faces unsorted instead of failing; the imprecision only affects
    /// point-classification queries inside that cell.
    pub max_depth: u32,
}

impl Default for BspBuildParams {
    fn default() -> Self {
        BspBuildParams {
            test_set_size: 10,
            split_weight: 1.0,
            imbalance_weight: 0.5,
            log_area_sigma_threshold: 2.0,
            max_depth: 48,
        }
    }
}

/// One node of a [`Bsp`].
#[derive(Clone, Debug)]
pub enum BspNode {
    /// An interior node: a splitting plane, the mesh faces lying on it, and
    /// the two child cells.
    Split {
        /// The splitting plane.
        plane: Plane,
        /// The mesh faces supported by this node's plane.
        faces: FractureMesh,
        /// The child cell on the normal side of the plane.
        front: u32,
        /// The child cell behind the plane.
        back: u32,
    },
    /// A homogeneous cell.
    Leaf {
        /// `true` if the cell lies inside the solid.
        solid: bool,
    },
}

/// A binary space partition of a closed mesh.
///
/// Interior nodes carry the faces supported by their splitting plane, so the
/// original surface can be reconstructed from the tree; leaves record whether
/// their cell is inside or outside the solid.
#[derive(Debug)]
pub struct Bsp {
    pub(crate) nodes: Vec<BspNode>,
}

struct BuildTriangle {
    pts: [Point<Real>; 3],
    submesh: u32,
    plane: Plane,
    area: Real,
}

struct Candidate {
    plane: Plane,
    total_area: Real,
}

impl Bsp {
    /// Builds a BSP tree from a closed mesh.
    ///
    /// The splitting plane of every node is selected among the candidate
    /// triangle planes by a randomized, weighted score favoring low
    /// split-count and low imbalance, except when the log-area-sigma test
    /// flags an outlier surface (see [`BspBuildParams`]). The random source
    /// is seeded once, so identical inputs produce identical trees.
    pub fn from_mesh(
        mesh: &FractureMesh,
        tol: &Tolerances,
        params: &BspBuildParams,
        seed: u64,
    ) -> Result<Bsp, GeometryError> {
        let degenerate_area = tol.cleaning * tol.cleaning;
        let mut tris = Vec::with_capacity(mesh.num_triangles());

        for i in 0..mesh.num_triangles() {
            let pts = mesh.triangle(i);
            if !pts
                .iter()
                .all(|p| p.coords.iter().all(|x| x.is_finite()))
            {
                return Err(GeometryError::FailedClassification);
            }
            let area = mesh.triangle_area(i);
            if area <= degenerate_area {
                continue;
            }
            if let Some(plane) = Plane::from_triangle(&pts[0], &pts[1], &pts[2]) {
                tris.push(BuildTriangle {
                    pts,
                    submesh: mesh.submeshes()[i],
                    plane,
                    area,
                });
            }
        }

        if tris.is_empty() {
            return Err(GeometryError::DegenerateInput);
        }

        // A mesh whose faces all share one supporting plane encloses no
        // volume and cannot be partitioned.
        let first = tris[0].plane;
        if tris.iter().all(|t| {
            let dot = t.plane.normal.dot(&first.normal);
            dot.abs() > 1.0 - tol.angular
                && (t.plane.bias - dot.signum() * first.bias).abs() <= tol.linear
        }) {
            return Err(GeometryError::DegenerateInput);
        }

        let mut bsp = Bsp { nodes: Vec::new() };
        let mut rng = SeededRng::new(seed);
        let _ = bsp.build_node(tris, 0, false, tol, params, &mut rng);
        Ok(bsp)
    }

    /// The nodes of this tree; the root is node 0.
    #[inline]
    pub fn nodes(&self) -> &[BspNode] {
        &self.nodes
    }

    /// Tests whether `point` lies inside the solid represented by this tree.
    pub fn contains_point(&self, point: &Point<Real>, tol: &Tolerances) -> bool {
        let mut current = 0u32;
        loop {
            match &self.nodes[current as usize] {
                BspNode::Leaf { solid } => return *solid,
                BspNode::Split {
                    plane, front, back, ..
                } => {
                    current = match plane.classify(point, tol.linear) {
                        PlaneSide::Front => *front,
                        // On-plane points are classified as inside.
                        PlaneSide::Back | PlaneSide::On => *back,
                    };
                }
            }
        }
    }

    fn build_node(
        &mut self,
        tris: Vec<BuildTriangle>,
        depth: u32,
        from_back: bool,
        tol: &Tolerances,
        params: &BspBuildParams,
        rng: &mut SeededRng,
    ) -> u32 {
        if tris.is_empty() {
            self.nodes.push(BspNode::Leaf { solid: from_back });
            return self.nodes.len() as u32 - 1;
        }

        if depth >= params.max_depth {
            // Accept the cell as-is: keep its faces on the first plane and
            // stop sorting. Point queries inside this cell lose precision.
            log::debug!(
                "BSP recursion depth bound hit with {} faces remaining.",
                tris.len()
            );
            let plane = tris[0].plane;
            let faces = collect_faces(&tris);
            self.nodes.push(BspNode::Split {
                plane,
                faces,
                front: 0,
                back: 0,
            });
            let node = self.nodes.len() as u32 - 1;
            let front = self.push_leaf(false);
            let back = self.push_leaf(true);
            self.patch_children(node, front, back);
            return node;
        }

        let plane = select_plane(&tris, tol, params, rng);

        // Partition the triangles, splitting the ones crossing the plane.
        let mut on_plane = Vec::new();
        let mut front_tris = Vec::new();
        let mut back_tris = Vec::new();

        for tri in tris {
            let sides = [
                plane.classify(&tri.pts[0], tol.linear),
                plane.classify(&tri.pts[1], tol.linear),
                plane.classify(&tri.pts[2], tol.linear),
            ];
            let has_front = sides.contains(&PlaneSide::Front);
            let has_back = sides.contains(&PlaneSide::Back);

            if !has_front && !has_back {
                on_plane.push(tri);
            } else if !has_back {
                front_tris.push(tri);
            } else if !has_front {
                back_tris.push(tri);
            } else {
                split_build_triangle(&tri, &plane, &mut front_tris, &mut back_tris);
            }
        }

        let faces = collect_faces(&on_plane);
        self.nodes.push(BspNode::Split {
            plane,
            faces,
            front: 0,
            back: 0,
        });
        let node = self.nodes.len() as u32 - 1;

        let front = self.build_node(front_tris, depth + 1, false, tol, params, rng);
        let back = self.build_node(back_tris, depth + 1, true, tol, params, rng);
        self.patch_children(node, front, back);
        node
    }

    fn push_leaf(&mut self, solid: bool) -> u32 {
        self.nodes.push(BspNode::Leaf { solid });
        self.nodes.len() as u32 - 1
    }

    fn patch_children(&mut self, node: u32, new_front: u32, new_back: u32) {
        if let BspNode::Split { front, back, .. } = &mut self.nodes[node as usize] {
            *front = new_front;
            *back = new_back;
        }
    }
}

fn collect_faces(tris: &[BuildTriangle]) -> FractureMesh {
    let mut faces = FractureMesh::empty();
    for tri in tris {
        faces.push_triangle(tri.pts, tri.submesh);
    }
    faces
}

// Selects the splitting plane for one node.
fn select_plane(
    tris: &[BuildTriangle],
    tol: &Tolerances,
    params: &BspBuildParams,
    rng: &mut SeededRng,
) -> Plane {
    // Merge coplanar triangles into candidate surfaces, accumulating area.
    let inv_linear = 1.0 / tol.linear.max(crate::math::DEFAULT_EPSILON);
    let inv_angular = 1.0 / tol.angular.max(crate::math::DEFAULT_EPSILON);
    let mut candidate_ids: HashMap<[i64; 4], usize> = HashMap::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for tri in tris {
        let n = tri.plane.normal;
        let key = [
            (n.x * inv_angular).round() as i64,
            (n.y * inv_angular).round() as i64,
            (n.z * inv_angular).round() as i64,
            (tri.plane.bias * inv_linear).round() as i64,
        ];
        let id = *candidate_ids.entry(key).or_insert_with(|| {
            candidates.push(Candidate {
                plane: tri.plane,
                total_area: 0.0,
            });
            candidates.len() - 1
        });
        candidates[id].total_area += tri.area;
    }

    if candidates.len() == 1 {
        return candidates[0].plane;
    }

    // Log-area statistics over the candidate surfaces: a surface whose area
    // is a statistical outlier must become the splitting plane, otherwise
    // random selection can shatter it into pathological trees.
    if params.log_area_sigma_threshold > 0.0 {
        let mut mean = 0.0;
        let mut max = -Real::MAX;
        let mut argmax = 0;
        for (i, c) in candidates.iter().enumerate() {
            let log_area = c.total_area.ln();
            mean += log_area;
            if log_area > max {
                max = log_area;
                argmax = i;
            }
        }
        mean /= candidates.len() as Real;

        let mut sigma2 = 0.0;
        for c in &candidates {
            let dev = c.total_area.ln() - mean;
            sigma2 += dev * dev;
        }
        sigma2 /= (candidates.len() - 1) as Real;

        let threshold = params.log_area_sigma_threshold;
        if max > mean && (max - mean) * (max - mean) >= threshold * threshold * sigma2 {
            return candidates[argmax].plane;
        }
    }

    // Otherwise score a bounded random test set: fewer split triangles and a
    // more balanced partition are both better.
    let mut best_plane = candidates[0].plane;
    let mut best_score = Real::MAX;

    for _ in 0..params.test_set_size.min(candidates.len()) {
        let candidate = &candidates[rng.index(candidates.len())];
        let mut splits = 0i64;
        let mut front = 0i64;
        let mut back = 0i64;

        for tri in tris {
            let sides = [
                candidate.plane.classify(&tri.pts[0], tol.linear),
                candidate.plane.classify(&tri.pts[1], tol.linear),
                candidate.plane.classify(&tri.pts[2], tol.linear),
            ];
            let has_front = sides.contains(&PlaneSide::Front);
            let has_back = sides.contains(&PlaneSide::Back);
            match (has_front, has_back) {
                (true, true) => splits += 1,
                (true, false) => front += 1,
                (false, true) => back += 1,
                (false, false) => {}
            }
        }

        let score = params.split_weight * splits as Real
            + params.imbalance_weight * (front - back).abs() as Real;
        if score < best_score {
            best_score = score;
            best_plane = candidate.plane;
        }
    }

    best_plane
}

// Splits one triangle by a plane, fanning each clipped polygon.
fn split_build_triangle(
    tri: &BuildTriangle,
    plane: &Plane,
    front_out: &mut Vec<BuildTriangle>,
    back_out: &mut Vec<BuildTriangle>,
) {
    let mut front_poly: Vec<Point<Real>> = Vec::with_capacity(4);
    let mut back_poly: Vec<Point<Real>> = Vec::with_capacity(4);

    for i in 0..3 {
        let a = tri.pts[i];
        let b = tri.pts[(i + 1) % 3];
        let da = plane.signed_distance(&a);
        let db = plane.signed_distance(&b);

        if da >= 0.0 {
            front_poly.push(a);
        }
        if da <= 0.0 {
            back_poly.push(a);
        }
        if (da > 0.0 && db < 0.0) || (da < 0.0 && db > 0.0) {
            let t = da / (da - db);
            let intersection = a + (b - a) * t;
            front_poly.push(intersection);
            back_poly.push(intersection);
        }
    }

    for (poly, out) in [(front_poly, front_out), (back_poly, back_out)] {
        for i in 1..poly.len().saturating_sub(1) {
            let pts = [poly[0], poly[i], poly[i + 1]];
            let area = (pts[1] - pts[0]).cross(&(pts[2] - pts[0])).norm() * 0.5;
            if area > 0.0 {
                out.push(BuildTriangle {
                    pts,
                    submesh: tri.submesh,
                    plane: tri.plane,
                    area,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point;

    fn cube() -> FractureMesh {
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
    fn cube_tree_classifies_points() {
        let mesh = cube();
        let tol = Tolerances::for_aabb(&mesh.compute_aabb());
        let bsp = Bsp::from_mesh(&mesh, &tol, &BspBuildParams::default(), 1234).unwrap();

        assert!(bsp.contains_point(&Point::new(0.0, 0.0, 0.0), &tol));
        assert!(bsp.contains_point(&Point::new(0.9, 0.9, -0.9), &tol));
        assert!(!bsp.contains_point(&Point::new(1.5, 0.0, 0.0), &tol));
        assert!(!bsp.contains_point(&Point::new(-2.0, 2.0, 0.0), &tol));
    }

    #[test]
    fn reconstruction_preserves_volume() {
        let mesh = cube();
        let tol = Tolerances::for_aabb(&mesh.compute_aabb());
        let bsp = Bsp::from_mesh(&mesh, &tol, &BspBuildParams::default(), 42).unwrap();

        let rebuilt = bsp.to_mesh(&tol);
        assert_relative_eq!(rebuilt.signed_volume(), 8.0, epsilon = 1.0e-3);
    }

    #[test]
    fn flat_geometry_is_degenerate() {
        let vertices = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ];
        let mesh = FractureMesh::with_uniform_submesh(vertices, vec![[0u32, 1, 2]]);
        let tol = Tolerances::for_aabb(&mesh.compute_aabb());

        assert_eq!(
            Bsp::from_mesh(&mesh, &tol, &BspBuildParams::default(), 0).unwrap_err(),
            GeometryError::DegenerateInput
        );
    }

    #[test]
    fn identical_seeds_build_identical_trees() {
        let mesh = cube();
        let tol = Tolerances::for_aabb(&mesh.compute_aabb());
        let a = Bsp::from_mesh(&mesh, &tol, &BspBuildParams::default(), 7).unwrap();
        let b = Bsp::from_mesh(&mesh, &tol, &BspBuildParams::default(), 7).unwrap();

        assert_eq!(a.nodes().len(), b.nodes().len());
    }
}
