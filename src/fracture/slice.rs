use crate::csg::{split_mesh, GeometryError, SplitOutcome, Tolerances};
use crate::fracture::{Progress, SliceDesc, SplitOutput, SurfaceNoise};
use crate::math::{Real, UnitVector, Vector};
use crate::shape::{FractureMesh, Plane};
use crate::utils::SeededRng;

/// Splits `mesh` by `desc.num_slices` perturbed planes, applied recursively
/// to every fragment produced so far.
///
/// Identical `(mesh, desc, seed)` inputs reproduce the identical plane
/// sequence. Degenerate fragments are discarded and counted; cancellation
/// between clip steps returns [`SplitOutput::Cancelled`] with the parent
/// untouched.
pub fn slice_split(
    mesh: &FractureMesh,
    desc: &SliceDesc,
    seed: u64,
    progress: &mut Progress,
) -> Result<SplitOutput, GeometryError> {
    let aabb = mesh.compute_aabb();
    let tol = Tolerances::for_aabb(&aabb);
    let diagonal = aabb.diagonal_length();
    let mut rng = SeededRng::new(seed);

    let planes = generate_slice_planes(desc, &aabb, diagonal, &mut rng);
    progress.set_total(1u32.checked_shl(desc.num_slices).unwrap_or(u32::MAX).min(4096));

    let mut pieces = vec![mesh.clone()];
    let mut discarded = 0u32;

    for plane in &planes {
        if progress.is_cancelled() {
            return Ok(SplitOutput::Cancelled);
        }

        let mut next_pieces = Vec::with_capacity(pieces.len() * 2);
        for piece in pieces {
            if progress.is_cancelled() {
                return Ok(SplitOutput::Cancelled);
            }

            match split_mesh(&piece, plane, &tol, desc.interior_submesh) {
                SplitOutcome::Pair(back, front) => {
                    for half in [back, front] {
                        if half.signed_volume().abs() > tol.degenerate_volume {
                            next_pieces.push(half);
                            progress.advance(1);
                        } else {
                            discarded += 1;
                        }
                    }
                }
                // The plane missed this fragment; it passes through unsplit.
                SplitOutcome::Negative | SplitOutcome::Positive => next_pieces.push(piece),
            }
        }
        pieces = next_pieces;

        if pieces.is_empty() {
            log::debug!("Every fragment of a slice pass degenerated.");
            return Err(GeometryError::ZeroVolumeFragments);
        }
    }

    Ok(SplitOutput::Completed { pieces, discarded })
}

// One plane per slice, cycling through the descriptor's axis order. Each
// axis' planes are evenly spaced across the bounds, jittered by the linear
// variation, tilted by the angular variation, and offset by the surface
// noise sampled where the plane meets the bounds center.
fn generate_slice_planes(
    desc: &SliceDesc,
    aabb: &crate::bounding_volume::Aabb,
    diagonal: Real,
    rng: &mut SeededRng,
) -> Vec<Plane> {
    let axes = desc.order.axes();
    let mut per_axis_count = [0u32; 3];
    for s in 0..desc.num_slices {
        per_axis_count[axes[s as usize % 3]] += 1;
    }

    let mut per_axis_done = [0u32; 3];
    let mut planes = Vec::with_capacity(desc.num_slices as usize);

    for s in 0..desc.num_slices {
        let axis = axes[s as usize % 3];
        let slots = per_axis_count[axis] + 1;
        let k = per_axis_done[axis];
        per_axis_done[axis] += 1;

        let extent = aabb.extents()[axis];
        let spacing = extent / slots as Real;
        let base = aabb.mins[axis] + spacing * (k + 1) as Real;
        let offset = base + desc.linear_variation * spacing * 0.5 * rng.symmetric_unit();

        // Tilt the axis normal by a random angle within the variation.
        let tilt = desc.angular_variation * rng.unit();
        let azimuth = rng.range(0.0, 2.0 * std::f64::consts::PI as Real);
        let axis_dir: UnitVector<Real> = Vector::ith_axis(axis);
        let up = Plane::new(axis_dir, 0.0).basis();
        let normal = UnitVector::new_normalize(
            axis_dir.into_inner() * tilt.cos()
                + (up[0] * azimuth.cos() + up[1] * azimuth.sin()) * tilt.sin(),
        );

        let mut anchor = aabb.center();
        anchor[axis] = offset;
        let noise = SurfaceNoise::new(&desc.noise, diagonal, rng);
        let bias = anchor.coords.dot(&normal) + noise.sample(&anchor);

        planes.push(Plane::new(normal, bias));
    }

    planes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fracture::{CancelFlag, NullProgress, SliceOrder};
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
    fn one_axis_slice_halves_the_cube() {
        let desc = SliceDesc {
            num_slices: 1,
            order: SliceOrder::Zxy,
            linear_variation: 0.0,
            angular_variation: 0.0,
            ..Default::default()
        };
        let mut listener = NullProgress;
        let mut progress = Progress::new(&mut listener, CancelFlag::new());

        match slice_split(&cube(), &desc, 5, &mut progress).unwrap() {
            SplitOutput::Completed { pieces, discarded } => {
                assert_eq!(pieces.len(), 2);
                assert_eq!(discarded, 0);
                let total: Real = pieces.iter().map(|p| p.signed_volume()).sum();
                assert_relative_eq!(total, 8.0, epsilon = 1.0e-3);
                for piece in &pieces {
                    let extents = piece.compute_aabb().extents();
                    assert_relative_eq!(extents.x, 2.0, epsilon = 1.0e-4);
                    assert_relative_eq!(extents.y, 2.0, epsilon = 1.0e-4);
                    assert_relative_eq!(extents.z, 1.0, epsilon = 1.0e-4);
                }
            }
            SplitOutput::Cancelled => panic!("nothing cancelled this split"),
        }
    }

    #[test]
    fn identical_seeds_reproduce_identical_pieces() {
        let desc = SliceDesc {
            num_slices: 4,
            linear_variation: 0.4,
            ..Default::default()
        };

        let run = || {
            let mut listener = NullProgress;
            let mut progress = Progress::new(&mut listener, CancelFlag::new());
            match slice_split(&cube(), &desc, 2024, &mut progress).unwrap() {
                SplitOutput::Completed { pieces, .. } => pieces,
                SplitOutput::Cancelled => panic!("nothing cancelled this split"),
            }
        };

        let a = run();
        let b = run();
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert_eq!(pa.num_triangles(), pb.num_triangles());
            assert_eq!(pa.vertices(), pb.vertices());
        }
    }

    #[test]
    fn pre_cancelled_split_reports_cancellation() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut listener = NullProgress;
        let mut progress = Progress::new(&mut listener, cancel);

        match slice_split(&cube(), &SliceDesc::default(), 1, &mut progress).unwrap() {
            SplitOutput::Cancelled => {}
            SplitOutput::Completed { .. } => panic!("the cancel flag was raised"),
        }
    }
}
