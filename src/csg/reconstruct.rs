use crate::csg::{Bsp, BspNode, Tolerances};
use crate::shape::FractureMesh;

impl Bsp {
    /// Reconstructs the watertight mesh represented by this tree.
    ///
    /// Every interior node carries the faces supported by its plane; faces on
    /// either side of a splitting plane were split against identical ancestor
    /// planes, so welding near-duplicate vertices per the `cleaning`
    /// tolerance closes the cell boundaries exactly. Triangles collapsed by
    /// the welding pass are dropped.
    pub fn to_mesh(&self, tol: &Tolerances) -> FractureMesh {
        let mut mesh = FractureMesh::empty();

        for node in &self.nodes {
            if let BspNode::Split { faces, .. } = node {
                mesh.append(faces);
            }
        }

        mesh.weld_vertices(tol.cleaning);
        mesh.remove_degenerate_triangles(tol.cleaning * tol.cleaning);
        mesh
    }
}
