use crate::support::cube_asset;
use shatter3d::asset::{ChunkFlags, CookParams, DestructibleAsset, NoHullProvider};
use shatter3d::fracture::{CancelFlag, NullProgress, Progress, SliceDesc, SliceOrder, VoronoiDesc};
use shatter3d::math::Vector;

fn axis_slice(axis_order: SliceOrder) -> SliceDesc {
    SliceDesc {
        num_slices: 1,
        order: axis_order,
        linear_variation: 0.0,
        angular_variation: 0.0,
        ..Default::default()
    }
}

// Root split in two, then one child split into Voronoi grandchildren.
fn three_level_asset() -> DestructibleAsset {
    let mut asset = cube_asset();
    let mut listener = NullProgress;
    let mut progress = Progress::new(&mut listener, CancelFlag::new());

    let report = asset
        .slice_chunk(
            0,
            &axis_slice(SliceOrder::Zxy),
            8,
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();
    let first_child = report.new_chunks[0];

    let desc = VoronoiDesc {
        site_count: 4,
        ..Default::default()
    };
    let report = asset
        .voronoi_chunk(
            first_child,
            &desc,
            13,
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();
    assert!(report.completed);
    asset
}

fn assert_tree_invariants(asset: &DestructibleAsset) {
    let chunks = asset.hierarchy().chunks();

    let mut roots = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.parent < 0 {
            roots += 1;
            assert_eq!(chunk.depth, 0);
        } else {
            let parent = &chunks[chunk.parent as usize];
            assert_eq!(chunk.depth, parent.depth + 1);
            assert!(parent.children.contains(&(i as u32)));
        }

        for &child in &chunk.children {
            assert_eq!(chunks[child as usize].parent, i as i32);
        }

        let part = &asset.parts()[chunk.part_index as usize];
        assert!(!part.hulls.is_empty(), "chunk {i} has no cooked hull");
    }
    assert_eq!(roots, 1);
}

#[test]
fn every_cook_pass_preserves_the_tree_invariants() {
    let asset = three_level_asset();
    assert_tree_invariants(&asset);
    assert_eq!(asset.hierarchy().depth_count(), 3);
}

#[test]
fn breadth_first_reorder_relabels_and_remaps_the_cache() {
    let mut asset = three_level_asset();

    // Split a depth-2 cell, then the remaining depth-1 half, so index order
    // no longer follows depth order and the renumbering has work to do.
    let mut listener = NullProgress;
    let mut progress = Progress::new(&mut listener, CancelFlag::new());
    let deep_cell = asset
        .chunk(0)
        .unwrap()
        .children
        .iter()
        .map(|&c| asset.chunk(c).unwrap())
        .flat_map(|c| c.children.clone())
        .next()
        .expect("a depth-2 chunk exists");
    let _ = asset
        .slice_chunk(
            deep_cell,
            &axis_slice(SliceOrder::Xyz),
            21,
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();
    let shallow = asset.chunk(0).unwrap().children[1];
    let _ = asset
        .slice_chunk(
            shallow,
            &axis_slice(SliceOrder::Yzx),
            22,
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();

    let depths: Vec<u32> = asset
        .hierarchy()
        .chunks()
        .iter()
        .map(|c| c.depth)
        .collect();
    assert!(
        depths.windows(2).any(|w| w[0] > w[1]),
        "the scenario should leave indices out of breadth-first order"
    );

    asset.parameters_mut().support_depth = 3;
    asset.cache_chunk_overlaps_up_to_depth(None);

    let counts_before: Vec<usize> = (0..3)
        .map(|d| asset.cached_overlap_count_at_depth(d))
        .collect();

    let table = asset.reorder_chunks_breadth_first();
    assert_eq!(table.len(), asset.chunk_count() as usize);

    // Indices are breadth-first ordered: depths never decrease.
    let chunks = asset.hierarchy().chunks();
    for pair in chunks.windows(2) {
        assert!(pair[0].depth <= pair[1].depth);
    }
    assert_tree_invariants(&asset);

    // The cache was remapped through the same table: edge counts survive and
    // every edge still connects distinct same-depth chunks.
    for depth in 0..3u32 {
        assert_eq!(
            asset.cached_overlap_count_at_depth(depth),
            counts_before[depth as usize]
        );
        for edge in asset.overlaps_at_depth(depth) {
            let (a, b) = **edge;
            assert_ne!(a, b);
            assert_eq!(asset.chunk(a).unwrap().depth, depth);
            assert_eq!(asset.chunk(b).unwrap().depth, depth);
        }
    }
}

#[test]
fn do_not_fracture_chunks_are_left_alone() {
    let mut asset = cube_asset();
    asset.set_chunk_flags(0, ChunkFlags::DO_NOT_FRACTURE).unwrap();

    let mut listener = NullProgress;
    let mut progress = Progress::new(&mut listener, CancelFlag::new());
    let report = asset
        .slice_chunk(
            0,
            &axis_slice(SliceOrder::Xyz),
            5,
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();

    assert!(report.completed);
    assert!(report.new_chunks.is_empty());
    assert_eq!(asset.chunk_count(), 1);
}

#[test]
fn instanced_chunks_reuse_their_source_part() {
    let mut asset = three_level_asset();
    let source = 1u32;
    let parent = 0u32;

    let index = asset
        .insert_instanced_chunk(parent, source, Vector::new(3.0, 0.0, 0.0), [0.5, 0.0])
        .unwrap();

    let chunk = asset.chunk(index).unwrap();
    assert!(chunk.flags.contains(ChunkFlags::INSTANCED));
    assert_eq!(
        chunk.part_index,
        asset.chunk(source).unwrap().part_index
    );
    assert_eq!(chunk.instance_offset, Some(Vector::new(3.0, 0.0, 0.0)));
    assert_tree_invariants(&asset);
}
