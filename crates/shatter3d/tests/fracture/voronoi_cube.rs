use crate::support::cube_asset;
use approx::assert_relative_eq;
use shatter3d::asset::{CookParams, NoHullProvider};
use shatter3d::fracture::{CancelFlag, NullProgress, Progress, VoronoiDesc};

#[test]
fn eight_sites_with_seed_42_partition_the_cube() {
    let mut asset = cube_asset();
    let mut listener = NullProgress;
    let mut progress = Progress::new(&mut listener, CancelFlag::new());

    let desc = VoronoiDesc {
        site_count: 8,
        ..Default::default()
    };
    let report = asset
        .voronoi_chunk(
            0,
            &desc,
            42,
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();

    assert!(report.completed);
    assert_eq!(report.new_chunks.len(), 8);
    assert_eq!(report.discarded, 0);

    let parent_bounds = *asset.bounds();
    let mut total = 0.0;
    for &child in &report.new_chunks {
        let chunk = asset.chunk(child).unwrap();
        assert_eq!(chunk.depth, 1);
        assert_eq!(chunk.parent, 0);
        assert!(parent_bounds.contains(&chunk.bounds, 1.0e-4));

        let part = &asset.parts()[chunk.part_index as usize];
        let mesh = &asset.render_meshes()[part.render_mesh as usize];
        let volume = mesh.signed_volume();
        assert!(volume > 0.0, "cell {child} is degenerate");
        total += volume;
    }

    assert_relative_eq!(total, 8.0, epsilon = 8.0 * 1.0e-4);
}

#[test]
fn voronoi_determinism_across_runs() {
    let desc = VoronoiDesc {
        site_count: 5,
        ..Default::default()
    };

    let run = || {
        let mut asset = cube_asset();
        let mut listener = NullProgress;
        let mut progress = Progress::new(&mut listener, CancelFlag::new());
        let report = asset
            .voronoi_chunk(
                0,
                &desc,
                7,
                &mut progress,
                &NoHullProvider,
                &CookParams::default(),
            )
            .unwrap();
        let mut triangle_counts = Vec::new();
        for &child in &report.new_chunks {
            let chunk = asset.chunk(child).unwrap();
            let part = &asset.parts()[chunk.part_index as usize];
            triangle_counts.push(asset.render_meshes()[part.render_mesh as usize].num_triangles());
        }
        triangle_counts
    };

    assert_eq!(run(), run());
}
