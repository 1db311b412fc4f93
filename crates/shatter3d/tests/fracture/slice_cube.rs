use crate::support::cube_asset;
use approx::assert_relative_eq;
use shatter3d::asset::{AssetError, CookParams, NoHullProvider};
use shatter3d::fracture::{
    CancelFlag, NullProgress, Progress, ProgressListener, SliceDesc, SliceOrder,
};
use shatter3d::math::Real;

fn single_z_slice() -> SliceDesc {
    SliceDesc {
        num_slices: 1,
        order: SliceOrder::Zxy,
        linear_variation: 0.0,
        angular_variation: 0.0,
        ..Default::default()
    }
}

#[test]
fn slicing_a_cube_at_its_midplane_yields_two_boxes() {
    let mut asset = cube_asset();
    let mut listener = NullProgress;
    let mut progress = Progress::new(&mut listener, CancelFlag::new());

    let report = asset
        .slice_chunk(
            0,
            &single_z_slice(),
            11,
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();

    assert!(report.completed);
    assert_eq!(report.new_chunks.len(), 2);
    assert_eq!(report.discarded, 0);
    assert_eq!(asset.chunk_count(), 3);

    let parent_volume = 8.0;
    let mut total = 0.0;
    for &child in &report.new_chunks {
        let chunk = asset.chunk(child).unwrap();
        assert_eq!(chunk.depth, 1);
        assert_eq!(chunk.parent, 0);

        let extents = chunk.bounds.extents();
        assert_relative_eq!(extents.x, 2.0, epsilon = 1.0e-4);
        assert_relative_eq!(extents.y, 2.0, epsilon = 1.0e-4);
        assert_relative_eq!(extents.z, 1.0, epsilon = 1.0e-4);

        let part = &asset.parts()[chunk.part_index as usize];
        assert!(!part.hulls.is_empty());
        let mesh = &asset.render_meshes()[part.render_mesh as usize];
        total += mesh.signed_volume();

        // Cut faces carry the interior material tag.
        assert!(mesh.submeshes().contains(&1));
    }
    assert_relative_eq!(total, parent_volume, epsilon = 1.0e-3);
}

#[test]
fn identical_descriptor_and_seed_reproduce_identical_children() {
    let desc = SliceDesc {
        num_slices: 3,
        linear_variation: 0.3,
        ..Default::default()
    };

    let run = || {
        let mut asset = cube_asset();
        let mut listener = NullProgress;
        let mut progress = Progress::new(&mut listener, CancelFlag::new());
        let report = asset
            .slice_chunk(
                0,
                &desc,
                90210,
                &mut progress,
                &NoHullProvider,
                &CookParams::default(),
            )
            .unwrap();
        (asset, report)
    };

    let (asset_a, report_a) = run();
    let (asset_b, report_b) = run();
    assert_eq!(report_a.new_chunks, report_b.new_chunks);

    for (&a, &b) in report_a.new_chunks.iter().zip(report_b.new_chunks.iter()) {
        let mesh_a = &asset_a.render_meshes()
            [asset_a.parts()[asset_a.chunk(a).unwrap().part_index as usize].render_mesh as usize];
        let mesh_b = &asset_b.render_meshes()
            [asset_b.parts()[asset_b.chunk(b).unwrap().part_index as usize].render_mesh as usize];
        assert_eq!(mesh_a.num_triangles(), mesh_b.num_triangles());
        assert_eq!(mesh_a.vertices(), mesh_b.vertices());
    }
}

#[test]
fn invalid_descriptors_are_refused_before_any_work() {
    let mut asset = cube_asset();
    let mut listener = NullProgress;
    let mut progress = Progress::new(&mut listener, CancelFlag::new());

    let desc = SliceDesc {
        num_slices: 0,
        ..Default::default()
    };
    let err = asset
        .slice_chunk(
            0,
            &desc,
            1,
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap_err();
    assert_eq!(err, AssetError::InvalidDescriptor);
    assert_eq!(asset.chunk_count(), 1);
}

// Raises the cancel flag at the first progress report, i.e. right after the
// first plane produces its first piece.
struct CancelAtFirstReport {
    flag: CancelFlag,
}

impl ProgressListener for CancelAtFirstReport {
    fn on_progress(&mut self, _percent: u32) {
        self.flag.cancel();
    }
}

#[test]
fn cancelling_after_the_first_plane_restores_the_parent() {
    let mut asset = cube_asset();
    let flag = CancelFlag::new();
    let mut listener = CancelAtFirstReport { flag: flag.clone() };
    let mut progress = Progress::new(&mut listener, flag);

    let desc = SliceDesc {
        num_slices: 4,
        ..Default::default()
    };
    let report = asset
        .slice_chunk(
            0,
            &desc,
            3,
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();

    assert!(!report.completed);
    assert!(report.new_chunks.is_empty());
    assert_eq!(asset.chunk_count(), 1);
    assert!(asset.chunk(0).unwrap().children.is_empty());

    let root_mesh = &asset.render_meshes()[0];
    let volume: Real = root_mesh.signed_volume();
    assert_relative_eq!(volume, 8.0, epsilon = 1.0e-4);
}
