use crate::csg::Tolerances;
use crate::math::{Point, Real, Vector};
use crate::shape::{FractureMesh, Plane};
use crate::utils::hashmap::HashMap;
use crate::utils::SortedPair;

/// The result of splitting a mesh by a plane.
pub enum SplitOutcome {
    /// The plane crosses the mesh: one closed piece on the back half-space,
    /// one on the front half-space.
    Pair(FractureMesh, FractureMesh),
    /// The mesh is fully contained in the back (negative) half-space.
    Negative,
    /// The mesh is fully contained in the front (positive) half-space.
    Positive,
}

/// Splits a closed mesh by a plane, capping both halves along the cut.
///
/// Crossing triangles are split by linear interpolation at edge/plane
/// intersections. Vertices within the `clip` tolerance of the plane are
/// classified as lying on it, which snaps nearby intersections to existing
/// vertices and avoids sliver triangles. Cap faces are tagged with
/// `interior_submesh`.
pub fn split_mesh(
    mesh: &FractureMesh,
    plane: &Plane,
    tol: &Tolerances,
    interior_submesh: u32,
) -> SplitOutcome {
    // 1. Partition the vertices.
    //
    // Color 0 = on plane.
    //       1 = on negative half-space.
    //       2 = on positive half-space.
    let vertices = mesh.vertices();
    let indices = mesh.indices();
    let mut colors = vec![0u8; vertices.len()];

    let mut found_negative = false;
    let mut found_positive = false;
    for (i, pt) in vertices.iter().enumerate() {
        let dist = plane.signed_distance(pt);
        if dist < -tol.clip {
            found_negative = true;
            colors[i] = 1;
        } else if dist > tol.clip {
            found_positive = true;
            colors[i] = 2;
        }
    }

    // Exit early if the mesh isn't crossed by the plane.
    if !found_negative {
        return SplitOutcome::Positive;
    }

    if !found_positive {
        return SplitOutcome::Negative;
    }

    // 2. Split the crossing triangles.
    const CROSSING_EDGE: u8 = 3;
    let mut intersections_found = HashMap::new();
    let mut new_indices = indices.to_vec();
    let mut new_submeshes = mesh.submeshes().to_vec();
    let mut new_vertices = vertices.to_vec();
    let mut k = 0;

    while k != new_indices.len() {
        let mut ic = 0;
        while ic < 3 {
            let idx = new_indices[k];
            let ia = (ic + 1) % 3;
            let ib = (ic + 2) % 3;
            let idx_a = idx[ia];
            let idx_b = idx[ib];
            let idx_c = idx[ic];

            if colors[idx_a as usize] + colors[idx_b as usize] == CROSSING_EDGE {
                let intersection_idx = *intersections_found
                    .entry(SortedPair::new(idx_a, idx_b))
                    .or_insert_with(|| {
                        let pa = new_vertices[idx_a as usize];
                        let pb = new_vertices[idx_b as usize];
                        let da = plane.signed_distance(&pa);
                        let db = plane.signed_distance(&pb);
                        // The edge crosses, so da and db have opposite signs.
                        let t = da / (da - db);
                        new_vertices.push(pa + (pb - pa) * t);
                        colors.push(0);
                        new_vertices.len() - 1
                    });

                // Replace the current triangle, and push the new one.
                let new_tri_a = [idx_c, idx_a, intersection_idx as u32];
                let new_tri_b = [idx_b, idx_c, intersection_idx as u32];
                new_indices[k] = new_tri_a;
                new_indices.push(new_tri_b);
                new_submeshes.push(new_submeshes[k]);
                // NOTE: we arranged the new triangle's vertices such that, if
                //       there is another intersection with `new_indices[k]`,
                //       then that intersection can only happen with `ic == 2`
                //       because we already know that the point at `idx[2]`
                //       lies on the cutting plane.
                ic = 2;
                continue;
            }

            ic += 1;
        }

        k += 1;
    }

    // 3. Partition the triangles into the two result meshes.
    let mut vertices_lhs = vec![];
    let mut vertices_rhs = vec![];
    let mut indices_lhs = vec![];
    let mut indices_rhs = vec![];
    let mut submeshes_lhs = vec![];
    let mut submeshes_rhs = vec![];
    let mut remap = vec![];

    for i in 0..new_vertices.len() {
        match colors[i] {
            0 => {
                remap.push((vertices_lhs.len() as u32, vertices_rhs.len() as u32));
                vertices_lhs.push(new_vertices[i]);
                vertices_rhs.push(new_vertices[i]);
            }
            1 => {
                remap.push((vertices_lhs.len() as u32, u32::MAX));
                vertices_lhs.push(new_vertices[i]);
            }
            2 => {
                remap.push((u32::MAX, vertices_rhs.len() as u32));
                vertices_rhs.push(new_vertices[i]);
            }
            _ => unreachable!(),
        }
    }

    // Directed cut-boundary edges, gathered from the negative-side triangles
    // in triangle order so the cap construction is deterministic.
    let mut boundary_edges: Vec<(u32, u32)> = Vec::new();
    let mut non_manifold_cut = false;
    let mut next_on_loop: HashMap<u32, u32> = HashMap::new();

    for (idx, &sub) in new_indices.iter().zip(new_submeshes.iter()) {
        let tri_colors = [
            colors[idx[0] as usize],
            colors[idx[1] as usize],
            colors[idx[2] as usize],
        ];

        if tri_colors.contains(&1) {
            debug_assert!(!tri_colors.contains(&2));
            indices_lhs.push([
                remap[idx[0] as usize].0,
                remap[idx[1] as usize].0,
                remap[idx[2] as usize].0,
            ]);
            submeshes_lhs.push(sub);

            for ic in 0..3 {
                let (u, v) = (idx[ic], idx[(ic + 1) % 3]);
                if colors[u as usize] == 0 && colors[v as usize] == 0 {
                    if next_on_loop.insert(u, v).is_some() {
                        non_manifold_cut = true;
                    }
                    boundary_edges.push((u, v));
                }
            }
        } else if tri_colors.contains(&2) {
            indices_rhs.push([
                remap[idx[0] as usize].1,
                remap[idx[1] as usize].1,
                remap[idx[2] as usize].1,
            ]);
            submeshes_rhs.push(sub);
        } else {
            // The colors are all 0, so push into both meshes.
            indices_lhs.push([
                remap[idx[0] as usize].0,
                remap[idx[1] as usize].0,
                remap[idx[2] as usize].0,
            ]);
            submeshes_lhs.push(sub);
            indices_rhs.push([
                remap[idx[0] as usize].1,
                remap[idx[1] as usize].1,
                remap[idx[2] as usize].1,
            ]);
            submeshes_rhs.push(sub);
        }
    }

    let mut mesh_lhs = FractureMesh::new(vertices_lhs, indices_lhs, submeshes_lhs);
    let mut mesh_rhs = FractureMesh::new(vertices_rhs, indices_rhs, submeshes_rhs);

    // 4. Cap the cut cross-section of both halves.
    if non_manifold_cut {
        // The cut grazes the surface at a pinch vertex; leave both halves
        // uncapped and let the caller's volume check sort the pieces out.
        log::debug!("Non-manifold cut cross-section; halves left uncapped.");
    } else {
        for loop_vertices in chain_loops(&boundary_edges, &next_on_loop) {
            let mut loop_pts: Vec<Point<Real>> =
                loop_vertices.iter().map(|&i| new_vertices[i as usize]).collect();

            // Orient the loop counter-clock-wise around the plane normal.
            if loop_signed_area(&loop_pts, &plane.normal) < 0.0 {
                loop_pts.reverse();
            }

            let centroid = polyline_centroid(&loop_pts);
            // The negative half lies behind the plane: its cap faces +normal.
            for w in 0..loop_pts.len() {
                let w1 = (w + 1) % loop_pts.len();
                mesh_lhs.push_triangle(
                    [centroid, loop_pts[w], loop_pts[w1]],
                    interior_submesh,
                );
                mesh_rhs.push_triangle(
                    [centroid, loop_pts[w1], loop_pts[w]],
                    interior_submesh,
                );
            }
        }

        mesh_lhs.weld_vertices(tol.cleaning);
        mesh_rhs.weld_vertices(tol.cleaning);
    }

    SplitOutcome::Pair(mesh_lhs, mesh_rhs)
}

// Chains directed edges into closed loops, in first-edge order.
fn chain_loops(edges: &[(u32, u32)], next: &HashMap<u32, u32>) -> Vec<Vec<u32>> {
    let mut visited: HashMap<u32, ()> = HashMap::new();
    let mut loops = Vec::new();

    for &(start, _) in edges {
        if visited.contains_key(&start) {
            continue;
        }

        let mut current = start;
        let mut loop_vertices = Vec::new();
        let mut closed = false;
        // Bounded by the total edge count so a broken chain cannot spin.
        for _ in 0..=edges.len() {
            loop_vertices.push(current);
            let _ = visited.insert(current, ());
            match next.get(&current) {
                Some(&succ) if succ == start => {
                    closed = true;
                    break;
                }
                Some(&succ) => current = succ,
                None => break,
            }
        }

        if closed && loop_vertices.len() >= 3 {
            loops.push(loop_vertices);
        }
    }

    loops
}

fn polyline_centroid(pts: &[Point<Real>]) -> Point<Real> {
    let mut acc = Vector::zeros();
    for pt in pts {
        acc += pt.coords;
    }
    Point::from(acc / pts.len().max(1) as Real)
}

// Twice the signed area of the polygon, about `normal`.
fn loop_signed_area(pts: &[Point<Real>], normal: &Vector<Real>) -> Real {
    let origin = pts[0];
    let mut acc = Vector::zeros();
    for w in 1..pts.len() {
        let w1 = (w + 1) % pts.len();
        acc += (pts[w] - origin).cross(&(pts[w1] - origin));
    }
    acc.dot(normal)
}
