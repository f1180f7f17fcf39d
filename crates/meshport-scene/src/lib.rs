//! # meshport-scene
//!
//! The in-memory scene model and the [`SceneEngine`] capability the
//! conversion pipeline is written against, together with
//! [`NativeEngine`], a pure-Rust implementation covering glTF/GLB, OBJ,
//! STL and 3MF.

pub mod bounds;
pub mod codecs;
pub mod document;
pub mod engine;
pub mod error;
pub mod mesh;
pub mod scene;

pub use bounds::Aabb;
pub use document::SceneDocument;
pub use engine::{EncodeOptions, Encoded, NativeEngine, SceneEngine};
pub use error::EngineError;
pub use mesh::Mesh;
pub use scene::{Node, Scene};
