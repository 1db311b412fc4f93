use crate::support::cube_asset;
use shatter3d::asset::{CookParams, DestructibleAsset, NoHullProvider, OverlapCacheError};
use shatter3d::fracture::{CancelFlag, NullProgress, Progress, SliceDesc, SliceOrder};

// A cube split once at its z midplane: two depth-1 children that touch.
fn halved_cube() -> DestructibleAsset {
    let mut asset = cube_asset();
    let mut listener = NullProgress;
    let mut progress = Progress::new(&mut listener, CancelFlag::new());
    let desc = SliceDesc {
        num_slices: 1,
        order: SliceOrder::Zxy,
        linear_variation: 0.0,
        angular_variation: 0.0,
        ..Default::default()
    };
    let report = asset
        .slice_chunk(
            0,
            &desc,
            1,
            &mut progress,
            &NoHullProvider,
            &CookParams::default(),
        )
        .unwrap();
    assert_eq!(report.new_chunks.len(), 2);
    asset
}

#[test]
fn touching_siblings_are_cached_and_recomputation_is_idempotent() {
    let mut asset = halved_cube();

    asset.cache_chunk_overlaps_up_to_depth(Some(1));
    assert!(asset.chunk_overlaps_cached(0));
    assert!(asset.chunk_overlaps_cached(1));
    assert_eq!(asset.cached_overlap_count_at_depth(0), 0);
    assert_eq!(asset.cached_overlap_count_at_depth(1), 1);

    let edges_before = asset.overlaps_at_depth(1).to_vec();
    asset.cache_chunk_overlaps_up_to_depth(Some(1));
    assert_eq!(asset.overlaps_at_depth(1), &edges_before[..]);
    assert!(asset.chunk_overlaps_cached(1));
}

#[test]
fn clearing_with_kept_flag_reads_as_computed_empty() {
    let mut asset = halved_cube();
    asset.cache_chunk_overlaps_up_to_depth(Some(1));
    assert_eq!(asset.cached_overlap_count_at_depth(1), 1);

    asset.clear_chunk_overlaps(Some(1), true);
    assert_eq!(asset.cached_overlap_count_at_depth(1), 0);
    assert!(asset.chunk_overlaps_cached(1));

    // Still cached, so recomputation must be a no-op.
    asset.cache_chunk_overlaps_up_to_depth(Some(1));
    assert_eq!(asset.cached_overlap_count_at_depth(1), 0);
}

#[test]
fn clearing_without_the_flag_triggers_recomputation() {
    let mut asset = halved_cube();
    asset.cache_chunk_overlaps_up_to_depth(Some(1));

    asset.clear_chunk_overlaps(Some(1), false);
    assert!(!asset.chunk_overlaps_cached(1));

    asset.cache_chunk_overlaps_up_to_depth(Some(1));
    assert!(asset.chunk_overlaps_cached(1));
    assert_eq!(asset.cached_overlap_count_at_depth(1), 1);
}

#[test]
fn mixed_depth_edges_are_rejected_and_the_rest_proceed() {
    let mut asset = halved_cube();
    asset.cache_chunk_overlaps_up_to_depth(Some(1));
    let count_before = asset.cached_overlap_count_at_depth(1);

    // Chunk 0 is the depth-0 root; chunks 1 and 2 are its depth-1 children.
    let rejected = asset.add_chunk_overlaps(&[(0, 1), (1, 2)]);
    assert_eq!(rejected, vec![OverlapCacheError::DepthMismatch(0, 1)]);

    // The valid (1, 2) edge already exists, so the count is unchanged.
    assert_eq!(asset.cached_overlap_count_at_depth(1), count_before);
    assert_eq!(asset.cached_overlap_count_at_depth(0), 0);
}

#[test]
fn unknown_chunks_and_self_edges_are_rejected() {
    let mut asset = halved_cube();

    let rejected = asset.add_chunk_overlaps(&[(1, 99), (1, 1)]);
    assert_eq!(
        rejected,
        vec![
            OverlapCacheError::UnknownChunk(99),
            OverlapCacheError::SelfEdge(1),
        ]
    );
}

#[test]
fn removing_the_last_edge_honors_the_keep_flag() {
    let mut asset = halved_cube();
    asset.cache_chunk_overlaps_up_to_depth(Some(1));

    asset.remove_chunk_overlaps(&[(1, 2)], true);
    assert_eq!(asset.cached_overlap_count_at_depth(1), 0);
    assert!(asset.chunk_overlaps_cached(1));

    let _ = asset.add_chunk_overlaps(&[(1, 2)]);
    asset.remove_chunk_overlaps(&[(1, 2)], false);
    assert!(!asset.chunk_overlaps_cached(1));
}

#[test]
fn support_edges_connect_distinct_equal_depth_chunks() {
    let mut asset = halved_cube();
    // With no explicit depth, caching walks up to the asset's support depth.
    asset.parameters_mut().support_depth = 1;
    asset.cache_chunk_overlaps_up_to_depth(None);
    assert!(asset.chunk_overlaps_cached(1));

    for depth in 0..2 {
        for edge in asset.overlaps_at_depth(depth) {
            let (a, b) = **edge;
            assert_ne!(a, b);
            assert_eq!(asset.chunk(a).unwrap().depth, depth);
            assert_eq!(asset.chunk(b).unwrap().depth, depth);
        }
    }
}
