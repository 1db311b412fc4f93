use crate::asset::{Chunk, ChunkFlags, OverlapCache};
use crate::bounding_volume::Aabb;

/// The chunk table refuses to grow past this many entries: runtime consumers
/// address chunks with 16-bit indices.
pub const MAX_CHUNK_COUNT: usize = u16::MAX as usize;

/// Errors raised by chunk-table mutations.
///
/// Every variant is fatal for the mutation that raised it; a cook pass
/// validates its whole batch before committing any chunk, so a failed pass
/// leaves the table untouched.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum HierarchyError {
    /// A second root insertion was attempted.
    #[error("the hierarchy already has a root chunk")]
    MultipleRoots,
    /// The given parent index does not refer to a chunk.
    #[error("invalid parent chunk index {0}")]
    InvalidParent(i32),
    /// The chunk table is full.
    #[error("the chunk table cannot exceed {MAX_CHUNK_COUNT} chunks")]
    TooManyChunks,
}

/// The indexed chunk table of a destructible asset.
///
/// Invariants: exactly one root (parent -1, depth 0); `depth(child) =
/// depth(parent) + 1`; after [`Self::reorder_breadth_first`], indices are
/// breadth-first ordered.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ChunkHierarchy {
    chunks: Vec<Chunk>,
}

impl ChunkHierarchy {
    /// An empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// The chunk table.
    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The number of chunks.
    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the table is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// One chunk, by index.
    #[inline]
    pub fn chunk(&self, index: u32) -> Option<&Chunk> {
        self.chunks.get(index as usize)
    }

    /// Mutable access to one chunk's authoring fields.
    #[inline]
    pub fn chunk_mut(&mut self, index: u32) -> Option<&mut Chunk> {
        self.chunks.get_mut(index as usize)
    }

    /// One more than the maximum chunk depth, 0 when empty.
    pub fn depth_count(&self) -> u32 {
        self.chunks.iter().map(|c| c.depth + 1).max().unwrap_or(0)
    }

    /// The indices of every chunk at `depth`, in index order.
    pub fn chunks_at_depth(&self, depth: u32) -> impl Iterator<Item = u32> + '_ {
        self.chunks
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.depth == depth)
            .map(|(i, _)| i as u32)
    }

    /// Validates that `extra` chunks can be inserted under `parent`.
    ///
    /// Cook passes call this before building any geometry so a failure
    /// commits nothing.
    pub fn validate_insertion(&self, parent: i32, extra: usize) -> Result<(), HierarchyError> {
        if parent < 0 {
            if !self.chunks.is_empty() {
                return Err(HierarchyError::MultipleRoots);
            }
            if extra > 1 {
                return Err(HierarchyError::MultipleRoots);
            }
        } else if parent as usize >= self.chunks.len() {
            return Err(HierarchyError::InvalidParent(parent));
        }
        if self.chunks.len() + extra > MAX_CHUNK_COUNT {
            return Err(HierarchyError::TooManyChunks);
        }
        Ok(())
    }

    /// Inserts one chunk under `parent` (-1 inserts the root).
    ///
    /// The new chunk's depth is its parent's plus one (0 for the root).
    pub fn insert_chunk(
        &mut self,
        parent: i32,
        part_index: u32,
        bounds: Aabb,
    ) -> Result<u32, HierarchyError> {
        self.validate_insertion(parent, 1)?;

        let depth = if parent < 0 {
            0
        } else {
            self.chunks[parent as usize].depth + 1
        };

        let index = self.chunks.len() as u32;
        self.chunks.push(Chunk {
            depth,
            parent,
            children: Vec::new(),
            part_index,
            flags: ChunkFlags::empty(),
            behavior_group: -1,
            bounds,
            instance_offset: None,
            instance_uv_offset: None,
        });

        if parent >= 0 {
            self.chunks[parent as usize].children.push(index);
        }

        Ok(index)
    }

    /// Relabels every chunk in breadth-first order (by depth, then by old
    /// index within a depth) and remaps the overlap cache through the same
    /// translation table, atomically.
    ///
    /// Returns the table mapping old indices to new ones.
    pub fn reorder_breadth_first(&mut self, cache: &mut OverlapCache) -> Vec<u32> {
        let mut order: Vec<u32> = (0..self.chunks.len() as u32).collect();
        order.sort_by_key(|&i| (self.chunks[i as usize].depth, i));

        // order[new] = old; the translation table goes the other way.
        let mut old_to_new = vec![0u32; self.chunks.len()];
        for (new, &old) in order.iter().enumerate() {
            old_to_new[old as usize] = new as u32;
        }

        let mut reordered = Vec::with_capacity(self.chunks.len());
        for &old in &order {
            let mut chunk = self.chunks[old as usize].clone();
            if chunk.parent >= 0 {
                chunk.parent = old_to_new[chunk.parent as usize] as i32;
            }
            for child in &mut chunk.children {
                *child = old_to_new[*child as usize];
            }
            chunk.children.sort_unstable();
            reordered.push(chunk);
        }

        // Both containers swap to the new numbering together.
        self.chunks = reordered;
        cache.remap_chunks(&old_to_new);

        old_to_new
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point;

    fn bounds() -> Aabb {
        Aabb::new(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn depths_follow_parents() {
        let mut hierarchy = ChunkHierarchy::new();
        let root = hierarchy.insert_chunk(-1, 0, bounds()).unwrap();
        let a = hierarchy.insert_chunk(root as i32, 1, bounds()).unwrap();
        let b = hierarchy.insert_chunk(root as i32, 2, bounds()).unwrap();
        let c = hierarchy.insert_chunk(a as i32, 3, bounds()).unwrap();

        assert_eq!(hierarchy.chunk(root).unwrap().depth, 0);
        assert_eq!(hierarchy.chunk(a).unwrap().depth, 1);
        assert_eq!(hierarchy.chunk(b).unwrap().depth, 1);
        assert_eq!(hierarchy.chunk(c).unwrap().depth, 2);
        assert_eq!(hierarchy.depth_count(), 3);
    }

    #[test]
    fn second_root_is_refused() {
        let mut hierarchy = ChunkHierarchy::new();
        let _ = hierarchy.insert_chunk(-1, 0, bounds()).unwrap();
        assert_eq!(
            hierarchy.insert_chunk(-1, 1, bounds()).unwrap_err(),
            HierarchyError::MultipleRoots
        );
    }

    #[test]
    fn invalid_parent_is_refused() {
        let mut hierarchy = ChunkHierarchy::new();
        let _ = hierarchy.insert_chunk(-1, 0, bounds()).unwrap();
        assert_eq!(
            hierarchy.insert_chunk(17, 1, bounds()).unwrap_err(),
            HierarchyError::InvalidParent(17)
        );
    }
}
