//! Triangle meshes.

use glam::{Mat4, Vec3};

use crate::bounds::Aabb;

/// A triangle mesh: positions, an optional index buffer and optional
/// per-vertex normals.
///
/// Without an index buffer every three consecutive positions form a
/// triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Optional mesh name, carried through to OBJ and glTF output.
    pub name: Option<String>,
    /// Vertex positions in node-local space.
    pub positions: Vec<Vec3>,
    /// Per-vertex normals, same length as `positions` when present.
    pub normals: Option<Vec<Vec3>>,
    /// Triangle list indices into `positions`.
    pub indices: Option<Vec<u32>>,
}

impl Mesh {
    /// Create a non-indexed mesh.
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    /// Set the index buffer.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Set the normals.
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of entries in the position attribute.
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices, if the mesh is indexed.
    pub fn index_count(&self) -> Option<usize> {
        self.indices.as_ref().map(Vec::len)
    }

    /// Position of vertex `index`.
    pub fn position(&self, index: usize) -> Option<Vec3> {
        self.positions.get(index).copied()
    }

    /// Overwrite the position of vertex `index`. Returns `false` when out of range.
    pub fn set_position(&mut self, index: usize, position: Vec3) -> bool {
        match self.positions.get_mut(index) {
            Some(slot) => {
                *slot = position;
                true
            }
            None => false,
        }
    }

    /// Vertex index triples of every complete triangle.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let count = match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        };
        (0..count).map(move |t| match &self.indices {
            Some(indices) => [
                indices[t * 3] as usize,
                indices[t * 3 + 1] as usize,
                indices[t * 3 + 2] as usize,
            ],
            None => [t * 3, t * 3 + 1, t * 3 + 2],
        })
    }

    /// Recompute per-vertex normals from the current positions.
    ///
    /// Face normals are accumulated unnormalized (area weighted) onto every
    /// vertex they touch and then normalized. Non-indexed meshes therefore
    /// get flat normals. Degenerate faces contribute nothing and vertices
    /// with no contribution keep a zero normal.
    pub fn recompute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for [a, b, c] in self.triangles() {
            let (Some(pa), Some(pb), Some(pc)) =
                (self.position(a), self.position(b), self.position(c))
            else {
                continue;
            };
            let face = (pc - pb).cross(pa - pb);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }

        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        self.normals = Some(normals);
    }

    /// Bounds of the positions after applying `world`.
    pub fn world_bounds(&self, world: &Mat4) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().map(|p| world.transform_point3(*p)))
    }
}
