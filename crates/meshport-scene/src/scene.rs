//! Scene graph: a tree of transformable nodes carrying meshes.

use glam::{Mat4, Quat, Vec3};

use crate::bounds::Aabb;
use crate::mesh::Mesh;

/// A node in the scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Optional node name.
    pub name: Option<String>,
    /// Local translation.
    pub translation: Vec3,
    /// Local rotation.
    pub rotation: Quat,
    /// Local scale.
    pub scale: Vec3,
    /// Geometry attached to this node.
    pub mesh: Option<Mesh>,
    /// Child nodes.
    pub children: Vec<Node>,
    /// Cached world matrix, valid after [`Scene::resolve_world_transforms`].
    world: Mat4,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: None,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            mesh: None,
            children: Vec::new(),
            world: Mat4::IDENTITY,
        }
    }
}

impl Node {
    /// An empty node with identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// A node carrying `mesh`.
    pub fn with_mesh(mesh: Mesh) -> Self {
        Self {
            mesh: Some(mesh),
            ..Default::default()
        }
    }

    /// Set the name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a child.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Set translation, rotation and scale from an affine matrix.
    ///
    /// Shear cannot be represented and is dropped.
    pub fn set_matrix(&mut self, matrix: Mat4) {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        self.scale = scale;
        self.rotation = rotation;
        self.translation = translation;
    }

    /// Local transform.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// World transform as of the last resolve.
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    /// Whether the local transform is the identity.
    pub fn has_identity_transform(&self) -> bool {
        self.translation == Vec3::ZERO && self.rotation == Quat::IDENTITY && self.scale == Vec3::ONE
    }

    fn resolve(&mut self, parent: &Mat4) {
        self.world = *parent * self.local_matrix();
        let world = self.world;
        for child in &mut self.children {
            child.resolve(&world);
        }
    }

    fn visit<'a>(&'a self, visitor: &mut dyn FnMut(&'a Node)) {
        visitor(self);
        for child in &self.children {
            child.visit(visitor);
        }
    }

    fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut Node)) {
        visitor(self);
        for child in &mut self.children {
            child.visit_mut(visitor);
        }
    }

    fn bounds_under(&self, parent: &Mat4, acc: &mut Option<Aabb>) {
        let world = *parent * self.local_matrix();
        if let Some(mesh_bounds) = self.mesh.as_ref().and_then(|m| m.world_bounds(&world)) {
            *acc = Some(match acc {
                Some(existing) => existing.union(&mesh_bounds),
                None => mesh_bounds,
            });
        }
        for child in &self.children {
            child.bounds_under(&world, acc);
        }
    }
}

/// A loaded model: a single root node and everything below it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// The root node. Transforms applied to the whole model go here.
    pub root: Node,
}

impl Scene {
    /// Wrap a root node.
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    /// A scene whose root has the given nodes as children.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self {
            root: Node {
                children: nodes,
                ..Default::default()
            },
        }
    }

    /// Visit every node depth-first, root first.
    pub fn traverse<'a>(&'a self, mut visitor: impl FnMut(&'a Node)) {
        self.root.visit(&mut visitor);
    }

    /// Visit every node mutably, depth-first, root first.
    pub fn traverse_mut(&mut self, mut visitor: impl FnMut(&mut Node)) {
        self.root.visit_mut(&mut visitor);
    }

    /// Visit every mesh together with its cached world matrix.
    pub fn for_each_mesh<'a>(&'a self, mut visitor: impl FnMut(&'a Mesh, Mat4)) {
        self.traverse(|node| {
            if let Some(mesh) = &node.mesh {
                visitor(mesh, node.world_matrix());
            }
        });
    }

    /// Visit every mesh mutably.
    pub fn for_each_mesh_mut(&mut self, mut visitor: impl FnMut(&mut Mesh)) {
        self.traverse_mut(|node| {
            if let Some(mesh) = node.mesh.as_mut() {
                visitor(mesh);
            }
        });
    }

    /// Number of meshes in the scene.
    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.for_each_mesh(|_, _| count += 1);
        count
    }

    /// Recompute every node's world matrix from the local transforms.
    pub fn resolve_world_transforms(&mut self) {
        self.root.resolve(&Mat4::IDENTITY);
    }

    /// World-space bounds of all mesh positions, computed from the current
    /// local transforms. `None` when the scene has no vertices.
    pub fn compute_world_bounds(&self) -> Option<Aabb> {
        let mut acc = None;
        self.root.bounds_under(&Mat4::IDENTITY, &mut acc);
        acc
    }
}
