use crate::support::cube_asset;
use approx::assert_relative_eq;
use shatter3d::asset::{CookParams, NoHullProvider};
use shatter3d::fracture::{CancelFlag, CutoutDesc, CutoutSet, NullProgress, Progress};

fn square_bitmap() -> CutoutSet {
    // An 8x8 buffer with a solid 4x4 square in the middle.
    let mut pixels = vec![0u8; 64];
    for y in 2..6 {
        for x in 2..6 {
            pixels[y * 8 + x] = 255;
        }
    }
    CutoutSet::from_pixels(8, 8, &pixels, 128, 0.5)
}

#[test]
fn a_square_cutout_chips_a_prism_out_of_the_cube() {
    let set = square_bitmap();
    assert_eq!(set.cutouts().len(), 1);

    let mut asset = cube_asset();
    let mut listener = NullProgress;
    let mut progress = Progress::new(&mut listener, CancelFlag::new());

    let report = asset
        .cutout_chunk(
            0,
            &set,
            &CutoutDesc::default(),
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();

    assert!(report.completed);
    // The chip plus at least one remainder island.
    assert!(report.new_chunks.len() >= 2);

    let mut total = 0.0;
    let mut volumes = Vec::new();
    for &child in &report.new_chunks {
        let chunk = asset.chunk(child).unwrap();
        assert_eq!(chunk.depth, 1);
        let part = &asset.parts()[chunk.part_index as usize];
        let mesh = &asset.render_meshes()[part.render_mesh as usize];
        let volume = mesh.signed_volume();
        assert!(volume > 0.0);
        volumes.push(volume);
        total += volume;
    }

    // Nothing is lost: the children partition the parent.
    assert_relative_eq!(total, 8.0, epsilon = 5.0e-2);

    // The traced square covers the middle quarter of the projected face, so
    // its through-cut chip is a 1x1 cross-section prism of volume 2.
    let chip_volume = volumes[0];
    assert_relative_eq!(chip_volume, 2.0, epsilon = 5.0e-2);
}

#[test]
fn cutout_respects_cancellation() {
    let set = square_bitmap();
    let mut asset = cube_asset();
    let flag = CancelFlag::new();
    flag.cancel();
    let mut listener = NullProgress;
    let mut progress = Progress::new(&mut listener, flag);

    let report = asset
        .cutout_chunk(
            0,
            &set,
            &CutoutDesc::default(),
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();

    assert!(!report.completed);
    assert_eq!(asset.chunk_count(), 1);
}
