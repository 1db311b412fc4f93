use crate::csg::{split_mesh, Bsp, BspBuildParams, GeometryError, SplitOutcome, Tolerances};
use crate::fracture::{Progress, SplitOutput, VoronoiDesc};
use crate::math::{Point, Real};
use crate::shape::{FractureMesh, Plane};
use crate::utils::SeededRng;

/// Splits `mesh` into the Voronoi cells of `desc.site_count` interior sites.
///
/// Sites are rejection-sampled inside the solid (validated against a BSP of
/// the mesh), and each cell is carved by clipping the parent against the
/// perpendicular-bisector planes of the site's nearest neighbors. Identical
/// `(mesh, desc, seed)` inputs reproduce the identical site sequence.
pub fn voronoi_split(
    mesh: &FractureMesh,
    desc: &VoronoiDesc,
    seed: u64,
    progress: &mut Progress,
) -> Result<SplitOutput, GeometryError> {
    let aabb = mesh.compute_aabb();
    let tol = Tolerances::for_aabb(&aabb);
    let mut rng = SeededRng::new(seed);

    let bsp = Bsp::from_mesh(mesh, &tol, &BspBuildParams::default(), seed)?;

    // Rejection-sample the sites inside the solid.
    let mut sites: Vec<Point<Real>> = Vec::with_capacity(desc.site_count as usize);
    let mut attempts = 0u32;
    while sites.len() < desc.site_count as usize && attempts < desc.max_site_attempts {
        attempts += 1;
        let candidate = Point::new(
            rng.range(aabb.mins.x, aabb.maxs.x),
            rng.range(aabb.mins.y, aabb.maxs.y),
            rng.range(aabb.mins.z, aabb.maxs.z),
        );
        if bsp.contains_point(&candidate, &tol) {
            sites.push(candidate);
        }
    }

    if sites.is_empty() {
        return Err(GeometryError::DegenerateInput);
    }
    if sites.len() < desc.site_count as usize {
        log::warn!(
            "Voronoi site sampling placed {}/{} sites before the attempt bound.",
            sites.len(),
            desc.site_count
        );
    }

    progress.set_total(sites.len() as u32);
    let mut pieces = Vec::with_capacity(sites.len());
    let mut discarded = 0u32;

    for (i, site) in sites.iter().enumerate() {
        if progress.is_cancelled() {
            return Ok(SplitOutput::Cancelled);
        }

        // The bisector planes of the nearest sites bound this cell; farther
        // sites cannot contribute a face.
        let mut neighbors: Vec<(Real, usize)> = sites
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, other)| (na::distance_squared(site, other), j))
            .collect();
        neighbors.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
        neighbors.truncate(desc.max_neighbors as usize);

        let mut cell = mesh.clone();
        let mut clipped_away = false;
        for &(_, j) in &neighbors {
            if progress.is_cancelled() {
                return Ok(SplitOutput::Cancelled);
            }

            let Some(bisector) = Plane::bisector(site, &sites[j]) else {
                continue;
            };
            match split_mesh(&cell, &bisector, &tol, desc.interior_submesh) {
                SplitOutcome::Pair(back, _front) => cell = back,
                SplitOutcome::Negative => {}
                SplitOutcome::Positive => {
                    clipped_away = true;
                    break;
                }
            }
        }

        if !clipped_away && cell.signed_volume().abs() > tol.degenerate_volume {
            pieces.push(cell);
            progress.advance(1);
        } else {
            discarded += 1;
        }
    }

    if pieces.is_empty() {
        return Err(GeometryError::ZeroVolumeFragments);
    }

    Ok(SplitOutput::Completed { pieces, discarded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fracture::{CancelFlag, NullProgress};

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
    fn eight_sites_partition_the_cube() {
        let desc = VoronoiDesc {
            site_count: 8,
            ..Default::default()
        };
        let mut listener = NullProgress;
        let mut progress = Progress::new(&mut listener, CancelFlag::new());

        match voronoi_split(&cube(), &desc, 42, &mut progress).unwrap() {
            SplitOutput::Completed { pieces, discarded } => {
                assert_eq!(pieces.len(), 8);
                assert_eq!(discarded, 0);

                let parent_aabb = cube().compute_aabb();
                let mut total = 0.0;
                for piece in &pieces {
                    let volume = piece.signed_volume();
                    assert!(volume > 0.0);
                    total += volume;
                    assert!(parent_aabb.contains(&piece.compute_aabb(), 1.0e-4));
                }
                assert_relative_eq!(total, 8.0, epsilon = 8.0 * 1.0e-4);
            }
            SplitOutput::Cancelled => panic!("nothing cancelled this split"),
        }
    }
}
