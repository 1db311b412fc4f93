use crate::asset::{
    cook_chunk_part, trim_hull_pair, AssetError, Chunk, ChunkFlags, ChunkHierarchy, ChunkPart,
    CookParams, HierarchyError, HullProvider, HullScaleCache, OverlapCache, OverlapCacheError,
};
use crate::bounding_volume::Aabb;
use crate::csg::GeometryError;
use crate::fracture::{
    cutout_split, slice_split, voronoi_split, CutoutDesc, CutoutSet, Progress, SliceDesc,
    SplitOutput, VoronoiDesc,
};
use crate::math::{Real, Vector};
use crate::shape::FractureMesh;
use crate::utils::SortedPair;

/// Global parameters of a destructible asset.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct AssetParameters {
    /// Depth at which chunks form the support graph by default.
    pub support_depth: u32,
    /// Support-graph proximity padding, relative to the asset bounds
    /// diagonal.
    pub neighbor_padding: Real,
    /// Damage a chunk absorbs before fracturing, forwarded to runtime
    /// consumers.
    pub damage_threshold: Real,
    /// Depth at and below which chunks become short-lived debris, or -1 to
    /// disable.
    pub debris_depth: i32,
}

impl Default for AssetParameters {
    fn default() -> Self {
        AssetParameters {
            support_depth: 0,
            neighbor_padding: 0.001,
            damage_threshold: 1.0,
            debris_depth: -1,
        }
    }
}

/// Authoring-time registries, owned by the host application and passed
/// explicitly to the builder.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CookRegistry {
    behavior_groups: Vec<String>,
    platform_tags: Vec<String>,
    /// Sub-mesh tag assigned to interior (cut) faces by fracture operations.
    pub interior_submesh: u32,
}

impl CookRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a behavior group and returns its index.
    pub fn register_behavior_group(&mut self, name: impl Into<String>) -> i32 {
        self.behavior_groups.push(name.into());
        self.behavior_groups.len() as i32 - 1
    }

    /// Registers a platform tag and returns its index.
    pub fn register_platform_tag(&mut self, name: impl Into<String>) -> u32 {
        self.platform_tags.push(name.into());
        self.platform_tags.len() as u32 - 1
    }

    /// The registered behavior group names.
    pub fn behavior_groups(&self) -> &[String] {
        &self.behavior_groups
    }

    /// The registered platform tags.
    pub fn platform_tags(&self) -> &[String] {
        &self.platform_tags
    }
}

/// The render-mesh-like input of a root cook: indexed triangles with one
/// material name per sub-mesh tag, a single part.
#[derive(Clone, Debug)]
pub struct RenderMeshDesc {
    /// The root geometry.
    pub mesh: FractureMesh,
    /// Material names, indexed by the mesh's sub-mesh tags.
    pub materials: Vec<String>,
}

/// What a fracture operation did to the asset.
#[derive(Clone, Debug, Default)]
pub struct FractureReport {
    /// `false` when the operation was cancelled; the asset is then
    /// untouched.
    pub completed: bool,
    /// Indices of the chunks the operation inserted.
    pub new_chunks: Vec<u32>,
    /// How many degenerate fragments were discarded. Authoring tools
    /// surface this count to the user.
    pub discarded: u32,
}

/// Diagnostic statistics of a cooked asset.
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct AssetStats {
    /// Total number of chunks.
    pub chunk_count: u32,
    /// Number of hierarchy depths.
    pub depth_count: u32,
    /// Total number of cooked geometry parts.
    pub part_count: u32,
    /// Largest vertex count over all cooked hulls.
    pub max_hull_vertex_count: u32,
    /// Largest face count over all cooked hulls.
    pub max_hull_face_count: u32,
    /// Approximate size of the cooked collision data, in bytes.
    pub cooked_bytes: usize,
}

/// A destructible asset under authoring.
///
/// Aggregates the chunk hierarchy, the cooked geometry parts, the render
/// meshes and the per-depth overlap cache, and routes fracture operations
/// through staged, all-or-nothing commits. One logical mutating operation
/// runs at a time (`&mut self`); per-chunk cooking and per-depth overlap
/// computation inside an operation may still fan out to worker threads.
pub struct DestructibleAsset {
    params: AssetParameters,
    registry: CookRegistry,
    hierarchy: ChunkHierarchy,
    parts: Vec<ChunkPart>,
    meshes: Vec<FractureMesh>,
    materials: Vec<String>,
    cache: OverlapCache,
    hull_scale_cache: HullScaleCache,
    bounds: Aabb,
}

impl DestructibleAsset {
    /// Cooks a new asset whose root chunk is the given render mesh.
    pub fn cook(
        desc: RenderMeshDesc,
        registry: CookRegistry,
        params: AssetParameters,
        provider: &dyn HullProvider,
        cook_params: &CookParams,
    ) -> Result<Self, AssetError> {
        if desc.mesh.num_triangles() == 0 {
            return Err(GeometryError::DegenerateInput.into());
        }

        let bounds = desc.mesh.compute_aabb();
        let hulls = cook_chunk_part(&desc.mesh, provider, cook_params)?;

        let mut asset = DestructibleAsset {
            params,
            registry,
            hierarchy: ChunkHierarchy::new(),
            parts: vec![ChunkPart {
                hulls,
                render_mesh: 0,
            }],
            meshes: vec![desc.mesh],
            materials: desc.materials,
            cache: OverlapCache::new(),
            hull_scale_cache: HullScaleCache::new(),
            bounds,
        };
        let _ = asset.hierarchy.insert_chunk(-1, 0, bounds)?;
        Ok(asset)
    }

    /// The asset parameters.
    pub fn parameters(&self) -> &AssetParameters {
        &self.params
    }

    /// Mutable access to the asset parameters.
    pub fn parameters_mut(&mut self) -> &mut AssetParameters {
        &mut self.params
    }

    /// The authoring registry.
    pub fn registry(&self) -> &CookRegistry {
        &self.registry
    }

    /// The chunk hierarchy.
    pub fn hierarchy(&self) -> &ChunkHierarchy {
        &self.hierarchy
    }

    /// The number of chunks.
    pub fn chunk_count(&self) -> u32 {
        self.hierarchy.len() as u32
    }

    /// One chunk, by index.
    pub fn chunk(&self, index: u32) -> Option<&Chunk> {
        self.hierarchy.chunk(index)
    }

    /// Sets a chunk's behavior flags.
    pub fn set_chunk_flags(&mut self, index: u32, flags: ChunkFlags) -> Result<(), AssetError> {
        let chunk = self
            .hierarchy
            .chunk_mut(index)
            .ok_or(HierarchyError::InvalidParent(index as i32))?;
        chunk.flags = flags;
        Ok(())
    }

    /// The cooked geometry parts.
    pub fn parts(&self) -> &[ChunkPart] {
        &self.parts
    }

    /// The render meshes, indexed by [`ChunkPart::render_mesh`].
    pub fn render_meshes(&self) -> &[FractureMesh] {
        &self.meshes
    }

    /// The material table of the root render mesh.
    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    /// The asset-local bounds of the root chunk.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// The hull-at-scale cache.
    pub fn hull_scale_cache_mut(&mut self) -> &mut HullScaleCache {
        &mut self.hull_scale_cache
    }

    /// Splits a chunk with slice-mode fracturing. See
    /// [`crate::fracture::slice_split`].
    pub fn slice_chunk(
        &mut self,
        chunk: u32,
        desc: &SliceDesc,
        seed: u64,
        progress: &mut Progress,
        provider: &dyn HullProvider,
        cook_params: &CookParams,
    ) -> Result<FractureReport, AssetError> {
        if !desc.validate() {
            return Err(AssetError::InvalidDescriptor);
        }
        let mesh = self.fracturable_mesh(chunk)?;
        let Some(mesh) = mesh else {
            return Ok(FractureReport {
                completed: true,
                ..Default::default()
            });
        };

        let mut desc = *desc;
        desc.interior_submesh = self.registry.interior_submesh;
        match slice_split(&mesh, &desc, seed, progress)? {
            SplitOutput::Cancelled => Ok(FractureReport::default()),
            SplitOutput::Completed { pieces, discarded } => {
                self.commit_pieces(chunk, pieces, discarded, provider, cook_params)
            }
        }
    }

    /// Splits a chunk with Voronoi-mode fracturing. See
    /// [`crate::fracture::voronoi_split`].
    pub fn voronoi_chunk(
        &mut self,
        chunk: u32,
        desc: &VoronoiDesc,
        seed: u64,
        progress: &mut Progress,
        provider: &dyn HullProvider,
        cook_params: &CookParams,
    ) -> Result<FractureReport, AssetError> {
        if !desc.validate() {
            return Err(AssetError::InvalidDescriptor);
        }
        let mesh = self.fracturable_mesh(chunk)?;
        let Some(mesh) = mesh else {
            return Ok(FractureReport {
                completed: true,
                ..Default::default()
            });
        };

        let mut desc = *desc;
        desc.interior_submesh = self.registry.interior_submesh;
        match voronoi_split(&mesh, &desc, seed, progress)? {
            SplitOutput::Cancelled => Ok(FractureReport::default()),
            SplitOutput::Completed { pieces, discarded } => {
                self.commit_pieces(chunk, pieces, discarded, provider, cook_params)
            }
        }
    }

    /// Splits a chunk with cutout-mode fracturing. See
    /// [`crate::fracture::cutout_split`].
    pub fn cutout_chunk(
        &mut self,
        chunk: u32,
        set: &CutoutSet,
        desc: &CutoutDesc,
        progress: &mut Progress,
        provider: &dyn HullProvider,
        cook_params: &CookParams,
    ) -> Result<FractureReport, AssetError> {
        if !desc.validate() {
            return Err(AssetError::InvalidDescriptor);
        }
        let mesh = self.fracturable_mesh(chunk)?;
        let Some(mesh) = mesh else {
            return Ok(FractureReport {
                completed: true,
                ..Default::default()
            });
        };

        let mut desc = *desc;
        desc.interior_submesh = self.registry.interior_submesh;
        match cutout_split(&mesh, set, &desc, progress)? {
            SplitOutput::Cancelled => Ok(FractureReport::default()),
            SplitOutput::Completed { pieces, discarded } => {
                self.commit_pieces(chunk, pieces, discarded, provider, cook_params)
            }
        }
    }

    /// Inserts an instanced chunk reusing `source`'s geometry part at an
    /// offset.
    pub fn insert_instanced_chunk(
        &mut self,
        parent: u32,
        source: u32,
        offset: Vector<Real>,
        uv_offset: [Real; 2],
    ) -> Result<u32, AssetError> {
        let source_chunk = self
            .hierarchy
            .chunk(source)
            .ok_or(HierarchyError::InvalidParent(source as i32))?;
        let part_index = source_chunk.part_index;
        let bounds = Aabb::new(
            source_chunk.bounds.mins + offset,
            source_chunk.bounds.maxs + offset,
        );

        let index = self.hierarchy.insert_chunk(parent as i32, part_index, bounds)?;
        let chunk = self
            .hierarchy
            .chunk_mut(index)
            .ok_or(HierarchyError::InvalidParent(index as i32))?;
        chunk.flags |= ChunkFlags::INSTANCED;
        chunk.instance_offset = Some(offset);
        chunk.instance_uv_offset = Some(uv_offset);
        self.invalidate_depths_from(chunk_depth(&self.hierarchy, index));
        Ok(index)
    }

    /// Computes and caches chunk overlaps for every uncached depth up to
    /// `depth` (default: the asset's support depth).
    pub fn cache_chunk_overlaps_up_to_depth(&mut self, depth: Option<u32>) {
        let deepest = self.hierarchy.depth_count().saturating_sub(1);
        let depth = depth.unwrap_or(self.params.support_depth).min(deepest);
        let padding = self.params.neighbor_padding * self.bounds.diagonal_length();
        self.cache
            .cache_up_to_depth(self.hierarchy.chunks(), &self.parts, depth, padding);
    }

    /// Merges externally supplied support edges; bad edges are rejected and
    /// returned while the rest proceed.
    pub fn add_chunk_overlaps(&mut self, edges: &[(u32, u32)]) -> Vec<OverlapCacheError> {
        self.cache.add_overlaps(self.hierarchy.chunks(), edges)
    }

    /// Removes support edges from the cache.
    pub fn remove_chunk_overlaps(&mut self, edges: &[(u32, u32)], keep_cached_flag_if_empty: bool) {
        self.cache
            .remove_overlaps(self.hierarchy.chunks(), edges, keep_cached_flag_if_empty)
    }

    /// Invalidates one cached depth, or all of them.
    pub fn clear_chunk_overlaps(&mut self, depth: Option<u32>, keep_cached_flag: bool) {
        self.cache.clear(depth, keep_cached_flag);
    }

    /// Whether `depth` has a cached (possibly empty) edge list.
    pub fn chunk_overlaps_cached(&self, depth: u32) -> bool {
        self.cache.is_cached(depth)
    }

    /// The number of cached support edges at `depth`.
    pub fn cached_overlap_count_at_depth(&self, depth: u32) -> usize {
        self.cache.overlap_count_at_depth(depth)
    }

    /// The cached support edges at `depth`, in insertion order.
    pub fn overlaps_at_depth(&self, depth: u32) -> &[SortedPair<u32>] {
        self.cache.overlaps_at_depth(depth)
    }

    /// Relabels chunks breadth-first and remaps the overlap cache through
    /// the same translation table. Returns the old-to-new table.
    pub fn reorder_chunks_breadth_first(&mut self) -> Vec<u32> {
        self.hierarchy.reorder_breadth_first(&mut self.cache)
    }

    /// Shrinks overlapping sibling hulls so spawned actors do not start in
    /// interpenetration. Clip distances are bounded by `max_trim_fraction`
    /// of each hull's extent.
    pub fn trim_collision_geometry(&mut self, max_trim_fraction: Real) {
        let deepest = self.hierarchy.depth_count().saturating_sub(1);
        self.cache_chunk_overlaps_up_to_depth(Some(deepest));

        for depth in 0..=deepest {
            let edges: Vec<SortedPair<u32>> = self.cache.overlaps_at_depth(depth).to_vec();
            for edge in edges {
                let (chunk_a, chunk_b) = *edge;
                let (part_a, part_b) = match (
                    self.hierarchy.chunk(chunk_a),
                    self.hierarchy.chunk(chunk_b),
                ) {
                    (Some(a), Some(b)) => (a.part_index as usize, b.part_index as usize),
                    _ => continue,
                };
                if part_a == part_b {
                    continue;
                }

                for ia in 0..self.parts[part_a].hulls.len() {
                    for ib in 0..self.parts[part_b].hulls.len() {
                        let (trimmed_a, trimmed_b) = trim_hull_pair(
                            &self.parts[part_a].hulls[ia],
                            &self.parts[part_b].hulls[ib],
                            max_trim_fraction,
                        );
                        if let Some(hull) = trimmed_a {
                            self.parts[part_a].hulls[ia] = hull;
                        }
                        if let Some(hull) = trimmed_b {
                            self.parts[part_b].hulls[ib] = hull;
                        }
                    }
                }
            }
        }

        // Rescaled copies of the old hulls are stale now.
        self.hull_scale_cache.clear();
    }

    /// Diagnostic statistics over the cooked data.
    pub fn stats(&self) -> AssetStats {
        let mut stats = AssetStats {
            chunk_count: self.hierarchy.len() as u32,
            depth_count: self.hierarchy.depth_count(),
            part_count: self.parts.len() as u32,
            ..Default::default()
        };

        for part in &self.parts {
            for hull in &part.hulls {
                stats.max_hull_vertex_count =
                    stats.max_hull_vertex_count.max(hull.vertices().len() as u32);
                stats.max_hull_face_count =
                    stats.max_hull_face_count.max(hull.indices().len() as u32);
                stats.cooked_bytes += hull.vertices().len()
                    * std::mem::size_of::<crate::math::Point<Real>>()
                    + hull.indices().len() * std::mem::size_of::<[u32; 3]>();
            }
        }

        stats
    }

    // The mesh a fracture operation should split, or `None` when the chunk
    // opted out of fracturing.
    fn fracturable_mesh(&self, chunk: u32) -> Result<Option<FractureMesh>, AssetError> {
        let chunk = self
            .hierarchy
            .chunk(chunk)
            .ok_or(HierarchyError::InvalidParent(chunk as i32))?;
        if chunk.flags.contains(ChunkFlags::DO_NOT_FRACTURE) {
            return Ok(None);
        }
        let part = &self.parts[chunk.part_index as usize];
        Ok(Some(self.meshes[part.render_mesh as usize].clone()))
    }

    // Stages the planner's pieces into cooked parts, then commits chunks,
    // parts and meshes together. Validation happens before any mutation, so
    // a failure leaves the asset untouched.
    fn commit_pieces(
        &mut self,
        parent: u32,
        pieces: Vec<FractureMesh>,
        mut discarded: u32,
        provider: &dyn HullProvider,
        cook_params: &CookParams,
    ) -> Result<FractureReport, AssetError> {
        let mut cooked = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match cook_chunk_part(&piece, provider, cook_params) {
                Ok(hulls) => cooked.push((piece, hulls)),
                Err(err) => {
                    log::debug!("Discarding a fragment whose hull failed to cook: {err}");
                    discarded += 1;
                }
            }
        }

        if cooked.is_empty() {
            // Discarding everything would orphan the parent's split.
            return Err(GeometryError::ZeroVolumeFragments.into());
        }

        self.hierarchy
            .validate_insertion(parent as i32, cooked.len())?;

        let mut new_chunks = Vec::with_capacity(cooked.len());
        for (piece, hulls) in cooked {
            let mesh_index = self.meshes.len() as u32;
            let part_index = self.parts.len() as u32;
            let bounds = piece.compute_aabb();
            self.meshes.push(piece);
            self.parts.push(ChunkPart {
                hulls,
                render_mesh: mesh_index,
            });
            new_chunks.push(self.hierarchy.insert_chunk(parent as i32, part_index, bounds)?);
        }

        self.invalidate_depths_from(chunk_depth(&self.hierarchy, parent) + 1);

        Ok(FractureReport {
            completed: true,
            new_chunks,
            discarded,
        })
    }

    // Structural changes at a depth make its cached overlaps stale.
    fn invalidate_depths_from(&mut self, depth: u32) {
        for d in depth..self.cache.depth_count() {
            self.cache.clear(Some(d), false);
        }
    }
}

fn chunk_depth(hierarchy: &ChunkHierarchy, index: u32) -> u32 {
    hierarchy.chunk(index).map(|c| c.depth).unwrap_or(0)
}
