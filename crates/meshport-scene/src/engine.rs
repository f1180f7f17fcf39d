//! The scene engine capability and its native implementation.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use meshport_core::{InputFormat, OutputFormat};

use crate::codecs;
use crate::document::SceneDocument;
use crate::error::EngineError;
use crate::scene::Scene;

/// Encoder knobs passed through from the conversion options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Binary sub-mode. Only STL has a choice; the other formats ignore it.
    pub binary: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { binary: true }
    }
}

/// What an export produces.
///
/// Scene-container formats stop at the document stage so that callers can
/// edit the JSON tree before the final serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Encoded {
    /// Final bytes (STL, OBJ).
    Bytes(Vec<u8>),
    /// glTF document not yet serialized (glTF, GLB).
    Document(SceneDocument),
}

/// Decodes bytes into a [`Scene`] and encodes a [`Scene`] back to bytes.
///
/// Loaded scenes come back with world transforms already resolved.
#[async_trait]
pub trait SceneEngine: Send + Sync + fmt::Debug + 'static {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Parse `bytes` as `format`.
    async fn load(&self, bytes: Bytes, format: InputFormat) -> Result<Scene, EngineError>;

    /// Encode `scene` as `format`.
    async fn export(
        &self,
        scene: &Scene,
        format: OutputFormat,
        options: &EncodeOptions,
    ) -> Result<Encoded, EngineError>;
}

/// Pure-Rust engine backed by the codecs in [`crate::codecs`].
///
/// Decoding and encoding run on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl NativeEngine {
    /// Create the engine.
    pub fn new() -> Self {
        Self
    }

    /// Synchronous decode, used by the async entry point.
    pub fn load_blocking(bytes: &[u8], format: InputFormat) -> Result<Scene, EngineError> {
        let mut scene = match format {
            InputFormat::Stl => codecs::stl::decode(bytes)?,
            InputFormat::Obj => codecs::obj::decode(bytes)?,
            InputFormat::Gltf | InputFormat::Glb => codecs::gltf::decode(bytes)?,
            InputFormat::ThreeMf => codecs::threemf::decode(bytes)?,
        };
        scene.resolve_world_transforms();
        Ok(scene)
    }

    /// Synchronous encode, used by the async entry point.
    pub fn export_blocking(
        scene: &Scene,
        format: OutputFormat,
        options: &EncodeOptions,
    ) -> Result<Encoded, EngineError> {
        match format {
            OutputFormat::Stl => Ok(Encoded::Bytes(codecs::stl::encode(scene, options.binary)?)),
            OutputFormat::Obj => Ok(Encoded::Bytes(codecs::obj::encode(scene))),
            OutputFormat::Gltf | OutputFormat::Glb => {
                Ok(Encoded::Document(codecs::gltf::encode(scene)?))
            }
        }
    }
}

#[async_trait]
impl SceneEngine for NativeEngine {
    fn name(&self) -> &str {
        "native"
    }

    async fn load(&self, bytes: Bytes, format: InputFormat) -> Result<Scene, EngineError> {
        let len = bytes.len();
        let scene =
            tokio::task::spawn_blocking(move || Self::load_blocking(&bytes, format)).await??;
        debug!(
            format = %format,
            bytes = len,
            meshes = scene.mesh_count(),
            "Decoded scene"
        );
        Ok(scene)
    }

    async fn export(
        &self,
        scene: &Scene,
        format: OutputFormat,
        options: &EncodeOptions,
    ) -> Result<Encoded, EngineError> {
        let mut owned = scene.clone();
        let options = *options;
        let encoded = tokio::task::spawn_blocking(move || {
            owned.resolve_world_transforms();
            Self::export_blocking(&owned, format, &options)
        })
        .await??;
        debug!(format = %format, "Encoded scene");
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::scene::Node;
    use glam::Vec3;

    fn triangle_scene() -> Scene {
        Scene::from_nodes(vec![Node::with_mesh(Mesh::new(vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
        ]))])
    }

    #[tokio::test]
    async fn test_stl_export_then_load() {
        let engine = NativeEngine::new();
        let encoded = engine
            .export(&triangle_scene(), OutputFormat::Stl, &EncodeOptions::default())
            .await
            .expect("export");
        let Encoded::Bytes(bytes) = encoded else {
            panic!("STL export should produce bytes");
        };
        assert_eq!(bytes.len(), 84 + 50);

        let scene = engine
            .load(Bytes::from(bytes), InputFormat::Stl)
            .await
            .expect("load");
        assert_eq!(scene.mesh_count(), 1);
    }

    #[tokio::test]
    async fn test_glb_export_is_document() {
        let engine = NativeEngine::new();
        let encoded = engine
            .export(&triangle_scene(), OutputFormat::Glb, &EncodeOptions::default())
            .await
            .expect("export");
        assert!(matches!(encoded, Encoded::Document(_)));
    }

    #[tokio::test]
    async fn test_load_garbage_obj_fails() {
        let engine = NativeEngine::new();
        let err = engine
            .load(Bytes::from_static(b"v 1 2 nope\n"), InputFormat::Obj)
            .await
            .expect_err("bad number");
        assert!(matches!(err, EngineError::Malformed { .. }));
    }
}
