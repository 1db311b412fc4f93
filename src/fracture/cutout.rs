//! Cutout ("chippable") fracturing: a 2D silhouette traced from a bitmap is
//! projected onto the mesh and the resulting prisms are carved out of it.

use crate::csg::{split_mesh, GeometryError, SplitOutcome, Tolerances};
use crate::fracture::{CutoutDesc, Progress, SplitOutput};
use crate::math::{Point, Real, Vector2};
use crate::shape::{FractureMesh, Plane};
use crate::utils::hashmap::HashMap;
use smallvec::SmallVec;

/// One closed cutout loop, with vertices normalized to `[0, 1]²`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Cutout {
    vertices: Vec<Vector2<Real>>,
}

impl Cutout {
    /// The loop vertices, in tracing order.
    #[inline]
    pub fn vertices(&self) -> &[Vector2<Real>] {
        &self.vertices
    }
}

/// A set of cutout loops traced from a greyscale/alpha pixel buffer.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CutoutSet {
    cutouts: Vec<Cutout>,
}

impl CutoutSet {
    /// The traced loops.
    #[inline]
    pub fn cutouts(&self) -> &[Cutout] {
        &self.cutouts
    }

    /// Traces the boundaries of the solid regions of a pixel buffer.
    ///
    /// A pixel is solid when its value is at least `threshold`. The traced
    /// boundaries follow pixel edges; runs of boundary points within
    /// `snap_threshold` (in pixels) of a straight segment are collapsed, so
    /// a clean bitmap produces the handful of vertices an artist would
    /// expect rather than a staircase. Loop coordinates are normalized to
    /// `[0, 1]²`.
    ///
    /// Holes are traced like outer boundaries; every closed loop becomes its
    /// own cutout.
    pub fn from_pixels(
        width: u32,
        height: u32,
        pixels: &[u8],
        threshold: u8,
        snap_threshold: Real,
    ) -> CutoutSet {
        assert_eq!(
            pixels.len(),
            (width * height) as usize,
            "The pixel buffer must be exactly width * height bytes."
        );

        let solid = |x: i64, y: i64| -> bool {
            x >= 0
                && y >= 0
                && x < width as i64
                && y < height as i64
                && pixels[(y * width as i64 + x) as usize] >= threshold
        };

        // Directed boundary edges between lattice corners, solid pixel kept
        // on the left of the walking direction.
        let mut outgoing: HashMap<(i64, i64), SmallVec<[(i64, i64); 2]>> = HashMap::new();
        let mut edge_list: Vec<((i64, i64), (i64, i64))> = Vec::new();
        let mut push_edge = |from: (i64, i64),
                             to: (i64, i64),
                             outgoing: &mut HashMap<(i64, i64), SmallVec<[(i64, i64); 2]>>,
                             edge_list: &mut Vec<((i64, i64), (i64, i64))>| {
            outgoing.entry(from).or_default().push(to);
            edge_list.push((from, to));
        };

        for y in 0..height as i64 {
            for x in 0..width as i64 {
                if !solid(x, y) {
                    continue;
                }
                if !solid(x, y - 1) {
                    push_edge((x, y), (x + 1, y), &mut outgoing, &mut edge_list);
                }
                if !solid(x, y + 1) {
                    push_edge((x + 1, y + 1), (x, y + 1), &mut outgoing, &mut edge_list);
                }
                if !solid(x - 1, y) {
                    push_edge((x, y + 1), (x, y), &mut outgoing, &mut edge_list);
                }
                if !solid(x + 1, y) {
                    push_edge((x + 1, y), (x + 1, y + 1), &mut outgoing, &mut edge_list);
                }
            }
        }

        let mut used: HashMap<((i64, i64), (i64, i64)), ()> = HashMap::new();
        let mut cutouts = Vec::new();

        for &(start, first_next) in &edge_list {
            if used.contains_key(&(start, first_next)) {
                continue;
            }

            let mut trace = vec![start];
            let mut prev = start;
            let mut current = first_next;
            let _ = used.insert((start, first_next), ());

            let mut closed = false;
            for _ in 0..=edge_list.len() {
                if current == start {
                    closed = true;
                    break;
                }
                trace.push(current);

                let dir = (current.0 - prev.0, current.1 - prev.1);
                let Some(next) = pick_next(&outgoing, current, dir, &used) else {
                    break;
                };
                let _ = used.insert((current, next), ());
                prev = current;
                current = next;
            }

            if !closed || trace.len() < 3 {
                continue;
            }

            let simplified = simplify_closed(&trace, snap_threshold.max(0.01));
            if simplified.len() < 3 {
                continue;
            }

            cutouts.push(Cutout {
                vertices: simplified
                    .iter()
                    .map(|p| {
                        Vector2::new(p.0 as Real / width as Real, p.1 as Real / height as Real)
                    })
                    .collect(),
            });
        }

        CutoutSet { cutouts }
    }
}

// At checkerboard corners two boundary edges leave the same lattice point;
// always take the sharpest left turn so loops never cross.
fn pick_next(
    outgoing: &HashMap<(i64, i64), SmallVec<[(i64, i64); 2]>>,
    current: (i64, i64),
    dir: (i64, i64),
    used: &HashMap<((i64, i64), (i64, i64)), ()>,
) -> Option<(i64, i64)> {
    let candidates = outgoing.get(&current)?;
    let mut best = None;
    let mut best_rank = -1i64;

    for &cand in candidates {
        if used.contains_key(&(current, cand)) {
            continue;
        }
        let cand_dir = (cand.0 - current.0, cand.1 - current.1);
        // Rank by turn direction: left turn > straight > right turn.
        let cross = dir.0 * cand_dir.1 - dir.1 * cand_dir.0;
        let dot = dir.0 * cand_dir.0 + dir.1 * cand_dir.1;
        let rank = if cross > 0 {
            2
        } else if cross == 0 && dot > 0 {
            1
        } else {
            0
        };
        if rank > best_rank {
            best_rank = rank;
            best = Some(cand);
        }
    }

    best
}

// Douglas-Peucker on a closed lattice loop.
fn simplify_closed(points: &[(i64, i64)], epsilon: Real) -> Vec<(i64, i64)> {
    // Split the loop at its two mutually farthest-ish points: the first
    // point and the point farthest from it.
    let mut far = 0;
    let mut far_dist = -1.0;
    for (i, p) in points.iter().enumerate() {
        let dx = (p.0 - points[0].0) as Real;
        let dy = (p.1 - points[0].1) as Real;
        let d = dx * dx + dy * dy;
        if d > far_dist {
            far_dist = d;
            far = i;
        }
    }
    if far == 0 {
        return Vec::new();
    }

    let first_half: Vec<(i64, i64)> = points[0..=far].to_vec();
    let mut second_half: Vec<(i64, i64)> = points[far..].to_vec();
    second_half.push(points[0]);

    let mut result = Vec::new();
    douglas_peucker(&first_half, epsilon, &mut result);
    let _ = result.pop(); // shared with the second chain's first point
    douglas_peucker(&second_half, epsilon, &mut result);
    let _ = result.pop(); // closing point duplicates the start
    result
}

fn douglas_peucker(points: &[(i64, i64)], epsilon: Real, out: &mut Vec<(i64, i64)>) {
    if points.len() <= 2 {
        out.extend_from_slice(points);
        return;
    }

    let (a, b) = (points[0], points[points.len() - 1]);
    let ab = ((b.0 - a.0) as Real, (b.1 - a.1) as Real);
    let ab_len = (ab.0 * ab.0 + ab.1 * ab.1).sqrt().max(1.0e-9);

    let mut split = 0;
    let mut max_dist = -1.0;
    for (i, p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let ap = ((p.0 - a.0) as Real, (p.1 - a.1) as Real);
        let dist = (ab.0 * ap.1 - ab.1 * ap.0).abs() / ab_len;
        if dist > max_dist {
            max_dist = dist;
            split = i;
        }
    }

    if max_dist > epsilon {
        douglas_peucker(&points[0..=split], epsilon, out);
        let _ = out.pop();
        douglas_peucker(&points[split..], epsilon, out);
    } else {
        out.push(a);
        out.push(b);
    }
}

// Ear-clipping triangulation of a simple polygon. Returns index triples,
// counter-clock-wise. The input is reoriented if it winds clockwise.
fn ear_clip(polygon: &[Vector2<Real>]) -> Vec<[usize; 3]> {
    let n = polygon.len();
    if n < 3 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut area = 0.0;
    for i in 0..n {
        let (p, q) = (polygon[i], polygon[(i + 1) % n]);
        area += p.x * q.y - q.x * p.y;
    }
    if area < 0.0 {
        order.reverse();
    }

    let mut triangles = Vec::with_capacity(n - 2);
    let mut guard = 0;
    while order.len() > 3 && guard < n * n {
        guard += 1;
        let m = order.len();
        let mut clipped_one = false;

        for i in 0..m {
            let (ia, ib, ic) = (order[(i + m - 1) % m], order[i], order[(i + 1) % m]);
            let (a, b, c) = (polygon[ia], polygon[ib], polygon[ic]);

            let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
            if cross <= 1.0e-12 {
                continue; // reflex or degenerate corner
            }

            let ear_is_empty = order.iter().all(|&j| {
                j == ia || j == ib || j == ic || !point_in_triangle(&polygon[j], &a, &b, &c)
            });
            if ear_is_empty {
                triangles.push([ia, ib, ic]);
                let _ = order.remove(i);
                clipped_one = true;
                break;
            }
        }

        if !clipped_one {
            // Numerically stuck polygon; finish with a fan rather than loop.
            log::debug!("Ear clipping stalled; fanning the remaining polygon.");
            break;
        }
    }

    if order.len() == 3 {
        triangles.push([order[0], order[1], order[2]]);
    } else {
        for i in 1..order.len().saturating_sub(1) {
            triangles.push([order[0], order[i], order[i + 1]]);
        }
    }

    triangles
}

fn point_in_triangle(
    p: &Vector2<Real>,
    a: &Vector2<Real>,
    b: &Vector2<Real>,
    c: &Vector2<Real>,
) -> bool {
    let sign = |p1: &Vector2<Real>, p2: &Vector2<Real>, p3: &Vector2<Real>| {
        (p1.x - p3.x) * (p2.y - p3.y) - (p2.x - p3.x) * (p1.y - p3.y)
    };
    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Carves the cutout loops out of `mesh`.
///
/// The loops are mapped onto the mesh through an affine+rotation projection
/// derived from the mesh's dominant (largest-area) face normal, ear-clipped,
/// and each ear's extruded prism is intersected with the mesh. Chips of one
/// loop merge into one child; whatever remains outside every loop forms the
/// remainder children (one per connected island).
pub fn cutout_split(
    mesh: &FractureMesh,
    set: &CutoutSet,
    desc: &CutoutDesc,
    progress: &mut Progress,
) -> Result<SplitOutput, GeometryError> {
    let aabb = mesh.compute_aabb();
    let tol = Tolerances::for_aabb(&aabb);
    let diagonal = aabb.diagonal_length();

    if mesh.num_triangles() == 0 {
        return Err(GeometryError::DegenerateInput);
    }

    // The projection frame: dominant face normal, plane touching the mesh
    // from the outside, in-plane basis covering the mesh's footprint.
    let mut dominant = 0;
    let mut dominant_area = -1.0;
    for i in 0..mesh.num_triangles() {
        let area = mesh.triangle_area(i);
        if area > dominant_area {
            dominant_area = area;
            dominant = i;
        }
    }
    let [da, db, dc] = mesh.triangle(dominant);
    let normal = Plane::from_triangle(&da, &db, &dc)
        .ok_or(GeometryError::DegenerateInput)?
        .normal;

    let support = mesh
        .vertices()
        .iter()
        .map(|p| p.coords.dot(&normal))
        .fold(-Real::MAX, Real::max);
    let top = Plane::new(normal, support);
    let [basis_u, basis_v] = top.basis();
    let origin = top.project_point(&aabb.center());

    let mut u_range = (Real::MAX, -Real::MAX);
    let mut v_range = (Real::MAX, -Real::MAX);
    for p in mesh.vertices() {
        let u = (p - origin).dot(&basis_u);
        let v = (p - origin).dot(&basis_v);
        u_range = (u_range.0.min(u), u_range.1.max(u));
        v_range = (v_range.0.min(v), v_range.1.max(v));
    }

    let to_world = |uv: &Vector2<Real>| -> Point<Real> {
        origin
            + basis_u * (u_range.0 + uv.x * (u_range.1 - u_range.0))
            + basis_v * (v_range.0 + uv.y * (v_range.1 - v_range.0))
    };

    progress.set_total(set.cutouts().len().max(1) as u32 + 1);

    let mut chips: Vec<FractureMesh> = Vec::new();
    let mut remainder_pieces: Vec<FractureMesh> = vec![mesh.clone()];
    let mut discarded = 0u32;

    for cutout in set.cutouts() {
        if progress.is_cancelled() {
            return Ok(SplitOutput::Cancelled);
        }

        let loop_pts: Vec<Point<Real>> = cutout.vertices().iter().map(&to_world).collect();
        let triangles = ear_clip(cutout.vertices());
        let mut chip = FractureMesh::empty();

        for tri in &triangles {
            if progress.is_cancelled() {
                return Ok(SplitOutput::Cancelled);
            }

            // The prism of this ear: three side planes plus the depth plane.
            let mut planes: SmallVec<[Plane; 4]> = SmallVec::new();
            let mut degenerate_prism = false;
            for e in 0..3 {
                let a = loop_pts[tri[e]];
                let b = loop_pts[tri[(e + 1) % 3]];
                match crate::math::UnitVector::try_new(
                    (b - a).cross(&normal),
                    crate::math::DEFAULT_EPSILON,
                ) {
                    Some(side_normal) => {
                        planes.push(Plane::from_point_and_normal(&a, side_normal))
                    }
                    None => degenerate_prism = true,
                }
            }
            if degenerate_prism {
                discarded += 1;
                continue;
            }
            if desc.depth > 0.0 {
                let floor = origin - *normal * (desc.depth * diagonal);
                planes.push(Plane::from_point_and_normal(
                    &floor,
                    crate::math::UnitVector::new_unchecked(-normal.into_inner()),
                ));
            }

            // Carve this prism out of every remainder piece.
            let mut next_remainder = Vec::with_capacity(remainder_pieces.len() + 1);
            for piece in remainder_pieces {
                let mut inside = Some(piece);
                for plane in &planes {
                    let current = match inside.take() {
                        Some(mesh) => mesh,
                        None => break,
                    };
                    match split_mesh(&current, plane, &tol, desc.interior_submesh) {
                        SplitOutcome::Pair(back, front) => {
                            inside = Some(back);
                            next_remainder.push(front);
                        }
                        SplitOutcome::Negative => inside = Some(current),
                        SplitOutcome::Positive => {
                            next_remainder.push(current);
                            break;
                        }
                    }
                }
                if let Some(inside) = inside {
                    if inside.signed_volume().abs() > tol.degenerate_volume {
                        chip.append(&inside);
                    } else {
                        discarded += 1;
                    }
                }
            }
            remainder_pieces = next_remainder;
        }

        chip.weld_vertices(tol.cleaning);
        chip.cancel_paired_faces();
        if chip.signed_volume().abs() > tol.degenerate_volume {
            chips.push(chip);
            progress.advance(1);
        } else if !triangles.is_empty() {
            discarded += 1;
        }
    }

    let mut remainder = FractureMesh::empty();
    for piece in &remainder_pieces {
        remainder.append(piece);
    }
    remainder.weld_vertices(tol.cleaning);
    remainder.cancel_paired_faces();

    let mut pieces = chips;
    for island in remainder.split_islands() {
        if island.signed_volume().abs() > tol.degenerate_volume {
            pieces.push(island);
        } else {
            discarded += 1;
        }
    }
    progress.advance(1);

    if pieces.is_empty() {
        return Err(GeometryError::ZeroVolumeFragments);
    }

    Ok(SplitOutput::Completed { pieces, discarded })
}
