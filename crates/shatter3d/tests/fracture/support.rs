use shatter3d::asset::{
    AssetParameters, CookParams, CookRegistry, DestructibleAsset, NoHullProvider, RenderMeshDesc,
};
use shatter3d::math::{Point, Real};
use shatter3d::shape::FractureMesh;

pub fn cube_mesh(half: Real) -> FractureMesh {
    let vertices = vec![
        Point::new(-half, -half, -half),
        Point::new(half, -half, -half),
        Point::new(half, half, -half),
        Point::new(-half, half, -half),
        Point::new(-half, -half, half),
        Point::new(half, -half, half),
        Point::new(half, half, half),
        Point::new(-half, half, half),
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

/// A cooked asset whose root chunk is a 2x2x2 cube, with sub-mesh 1 reserved
/// for interior faces.
pub fn cube_asset() -> DestructibleAsset {
    let mut registry = CookRegistry::new();
    registry.interior_submesh = 1;
    let _ = registry.register_behavior_group("default");

    DestructibleAsset::cook(
        RenderMeshDesc {
            mesh: cube_mesh(1.0),
            materials: vec!["stone".into(), "stone_interior".into()],
        },
        registry,
        AssetParameters::default(),
        &NoHullProvider,
        &CookParams::default(),
    )
    .unwrap()
}
