mod cutout_fracture;
mod hierarchy_invariants;
mod overlap_cache;
mod slice_cube;
mod support;
mod voronoi_cube;
