//! Geometric operations applied between load and export.

use glam::Vec3;
use tracing::debug;

use meshport_scene::Scene;

use crate::models::ConversionOptions;

/// The geometric subset of [`ConversionOptions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSpec {
    /// Uniform scale factor.
    pub scale: f32,
    /// Move the bounds center to the origin.
    pub center: bool,
    /// Swap Y and Z of every vertex.
    pub flip_yz: bool,
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            scale: 1.0,
            center: false,
            flip_yz: false,
        }
    }
}

impl From<&ConversionOptions> for TransformSpec {
    fn from(options: &ConversionOptions) -> Self {
        Self {
            scale: options.scale,
            center: options.center,
            flip_yz: options.flip_yz,
        }
    }
}

impl TransformSpec {
    /// Whether applying this spec would change anything.
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && !self.center && !self.flip_yz
    }
}

/// Apply scale, then axis swap, then centering, in place. World transforms
/// are resolved afterwards.
pub fn apply(scene: &mut Scene, spec: &TransformSpec) {
    if spec.scale != 1.0 {
        scene.root.scale *= spec.scale;
    }

    if spec.flip_yz {
        scene.for_each_mesh_mut(|mesh| {
            for p in &mut mesh.positions {
                *p = Vec3::new(p.x, p.z, p.y);
            }
            mesh.recompute_normals();
        });
    }

    if spec.center {
        if let Some(bounds) = scene.compute_world_bounds() {
            scene.root.translation -= bounds.center();
        }
    }

    scene.resolve_world_transforms();
    debug!(
        scale = spec.scale,
        center = spec.center,
        flip_yz = spec.flip_yz,
        "Applied transforms"
    );
}
