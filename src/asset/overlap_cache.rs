use crate::asset::{Chunk, ChunkPart};
use crate::math::Real;
use crate::utils::SortedPair;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Errors raised while merging externally supplied support-graph edges.
///
/// A bad edge is rejected on its own; the rest of the batch proceeds.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OverlapCacheError {
    /// The edge references a chunk index outside the table.
    #[error("support edge references unknown chunk {0}")]
    UnknownChunk(u32),
    /// The edge connects chunks at different depths.
    #[error("support edge connects chunks at different depths ({0}, {1})")]
    DepthMismatch(u32, u32),
    /// The edge connects a chunk to itself.
    #[error("support edge connects chunk {0} to itself")]
    SelfEdge(u32),
}

/// The cached support-graph edges of one depth.
///
/// `cached` is distinct from emptiness: a depth can be cached with zero
/// edges (computed, nothing touches) or uncached (never computed, or
/// explicitly invalidated).
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
struct CachedOverlaps {
    cached: bool,
    edges: Vec<SortedPair<u32>>,
}

/// Per-depth adjacency between sibling chunks, lazily computed and
/// explicitly invalidated.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct OverlapCache {
    depths: Vec<CachedOverlaps>,
}

impl OverlapCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of depths this cache has ever tracked.
    pub fn depth_count(&self) -> u32 {
        self.depths.len() as u32
    }

    /// Whether `depth` has a cached edge list (possibly empty).
    pub fn is_cached(&self, depth: u32) -> bool {
        self.depths
            .get(depth as usize)
            .map(|d| d.cached)
            .unwrap_or(false)
    }

    /// The number of cached edges at `depth`; 0 when uncached.
    pub fn overlap_count_at_depth(&self, depth: u32) -> usize {
        self.depths
            .get(depth as usize)
            .map(|d| d.edges.len())
            .unwrap_or(0)
    }

    /// The cached edges at `depth`, in insertion order; empty when uncached.
    pub fn overlaps_at_depth(&self, depth: u32) -> &[SortedPair<u32>] {
        self.depths
            .get(depth as usize)
            .map(|d| d.edges.as_slice())
            .unwrap_or(&[])
    }

    /// Computes and caches the support edges of every uncached depth up to
    /// and including `depth`.
    ///
    /// Two same-depth chunks overlap when their padded bounds intersect and
    /// a padded hull/sphere test between their parts agrees. A depth is
    /// marked cached even when no pair touches. Already-cached depths are
    /// not recomputed.
    pub fn cache_up_to_depth(
        &mut self,
        chunks: &[Chunk],
        parts: &[ChunkPart],
        depth: u32,
        padding: Real,
    ) {
        self.ensure_depth(depth);

        for d in 0..=depth {
            if self.depths[d as usize].cached {
                continue;
            }

            let at_depth: Vec<u32> = chunks
                .iter()
                .enumerate()
                .filter(|(_, c)| c.depth == d)
                .map(|(i, _)| i as u32)
                .collect();

            // Bounding-box pre-filter over the index-ordered pairs, so the
            // resulting edge order is stable.
            let mut candidates = Vec::new();
            for (i, &a) in at_depth.iter().enumerate() {
                let bounds_a = chunks[a as usize].bounds.loosened(padding);
                for &b in &at_depth[i + 1..] {
                    if bounds_a.intersects(&chunks[b as usize].bounds) {
                        candidates.push((a, b));
                    }
                }
            }

            // The narrow tests share no mutable state; order of evaluation
            // does not matter, only the order of the collected results.
            #[cfg(feature = "parallel")]
            let edges: Vec<SortedPair<u32>> = candidates
                .par_iter()
                .filter(|&&(a, b)| parts_touch(chunks, parts, a, b, padding))
                .map(|&(a, b)| SortedPair::new(a, b))
                .collect();

            #[cfg(not(feature = "parallel"))]
            let edges: Vec<SortedPair<u32>> = candidates
                .iter()
                .filter(|&&(a, b)| parts_touch(chunks, parts, a, b, padding))
                .map(|&(a, b)| SortedPair::new(a, b))
                .collect();

            let slot = &mut self.depths[d as usize];
            slot.edges = edges;
            slot.cached = true;
        }
    }

    /// Merges externally supplied edges into the cache.
    ///
    /// Each edge is validated against the chunk table: unknown chunks,
    /// mixed-depth pairs and self edges are rejected and reported while the
    /// rest of the batch proceeds. Duplicates of already-cached edges are
    /// skipped silently. Each touched depth is marked cached.
    pub fn add_overlaps(
        &mut self,
        chunks: &[Chunk],
        edges: &[(u32, u32)],
    ) -> Vec<OverlapCacheError> {
        let mut rejected = Vec::new();

        for &(a, b) in edges {
            if a as usize >= chunks.len() {
                rejected.push(OverlapCacheError::UnknownChunk(a));
                continue;
            }
            if b as usize >= chunks.len() {
                rejected.push(OverlapCacheError::UnknownChunk(b));
                continue;
            }
            if a == b {
                rejected.push(OverlapCacheError::SelfEdge(a));
                continue;
            }
            let depth_a = chunks[a as usize].depth;
            let depth_b = chunks[b as usize].depth;
            if depth_a != depth_b {
                rejected.push(OverlapCacheError::DepthMismatch(a, b));
                continue;
            }

            self.ensure_depth(depth_a);
            let slot = &mut self.depths[depth_a as usize];
            let pair = SortedPair::new(a, b);
            if !slot.edges.contains(&pair) {
                slot.edges.push(pair);
            }
            slot.cached = true;
        }

        rejected
    }

    /// Removes the given edges from the cache.
    ///
    /// If a depth's edge list becomes empty, its cached flag is kept only
    /// when `keep_cached_flag_if_empty` is set; otherwise the depth reverts
    /// to uncached.
    pub fn remove_overlaps(
        &mut self,
        chunks: &[Chunk],
        edges: &[(u32, u32)],
        keep_cached_flag_if_empty: bool,
    ) {
        for &(a, b) in edges {
            if a as usize >= chunks.len() || b as usize >= chunks.len() {
                continue;
            }
            let depth = chunks[a as usize].depth;
            if let Some(slot) = self.depths.get_mut(depth as usize) {
                let pair = SortedPair::new(a, b);
                slot.edges.retain(|e| *e != pair);
                if slot.edges.is_empty() && !keep_cached_flag_if_empty {
                    slot.cached = false;
                }
            }
        }
    }

    /// Invalidates one depth, or every depth when `depth` is `None`.
    ///
    /// With `keep_cached_flag` the edge lists are emptied but the depths
    /// still read as cached ("computed empty"); without it they revert to
    /// uncached ("needs recompute").
    pub fn clear(&mut self, depth: Option<u32>, keep_cached_flag: bool) {
        let range = match depth {
            Some(d) => {
                if d as usize >= self.depths.len() {
                    return;
                }
                d as usize..d as usize + 1
            }
            None => 0..self.depths.len(),
        };

        for slot in &mut self.depths[range] {
            slot.edges.clear();
            slot.cached = keep_cached_flag && slot.cached;
        }
    }

    /// Rewrites every cached edge through a chunk-index translation table.
    ///
    /// Called by the hierarchy's breadth-first renumbering so both
    /// containers switch numbering in one step.
    pub(crate) fn remap_chunks(&mut self, old_to_new: &[u32]) {
        for slot in &mut self.depths {
            for edge in &mut slot.edges {
                let (a, b) = **edge;
                *edge = SortedPair::new(old_to_new[a as usize], old_to_new[b as usize]);
            }
        }
    }

    fn ensure_depth(&mut self, depth: u32) {
        if self.depths.len() <= depth as usize {
            self.depths.resize_with(depth as usize + 1, Default::default);
        }
    }
}

// AABB pre-filter agreed; confirm with the padded hull test.
fn parts_touch(chunks: &[Chunk], parts: &[ChunkPart], a: u32, b: u32, padding: Real) -> bool {
    let part_a = &parts[chunks[a as usize].part_index as usize];
    let part_b = &parts[chunks[b as usize].part_index as usize];

    for hull_a in &part_a.hulls {
        for hull_b in &part_b.hulls {
            if hull_a.intersects_padded(hull_b, padding) {
                return true;
            }
        }
    }
    false
}
