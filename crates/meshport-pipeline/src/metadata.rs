//! Model metadata derived from the final scene and the encoded bytes.

use meshport_core::OutputFormat;
use meshport_scene::Scene;

use crate::models::{BoundingBox, ModelMetadata};

/// Count vertices and triangles in one traversal and take the bounds of
/// the transformed scene.
///
/// Triangles are summed per mesh as `index_count / 3` (or
/// `vertex_count / 3` when not indexed) without rounding, then floored
/// once.
pub fn compute(scene: &Scene, format: OutputFormat, byte_len: usize) -> ModelMetadata {
    let mut vertices: u64 = 0;
    let mut faces = 0f64;

    scene.for_each_mesh(|mesh, _| {
        let count = mesh.position_count();
        vertices += count as u64;
        faces += match mesh.index_count() {
            Some(indices) => indices as f64 / 3.0,
            None => count as f64 / 3.0,
        };
    });

    ModelMetadata {
        vertices,
        faces: faces.floor() as u64,
        file_size: byte_len as u64,
        format,
        bounding_box: scene.compute_world_bounds().map(BoundingBox::from),
    }
}
