//! Exporter dispatch: engine encode, attribution, final serialization.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use meshport_core::config::attribution::AttributionConfig;
use meshport_core::{ConvertError, OutputFormat};
use meshport_scene::{EncodeOptions, Encoded, EngineError, Scene, SceneDocument, SceneEngine};

use crate::attribution;

/// Failures while exporting a scene.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The engine could not encode the scene.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<ExportError> for ConvertError {
    fn from(err: ExportError) -> Self {
        ConvertError::wrap(err)
    }
}

/// Binary sub-mode actually used for `format`.
///
/// Only STL follows the caller; GLB is always binary, glTF and OBJ are
/// always text.
pub fn binary_mode(format: OutputFormat, requested: bool) -> bool {
    match format {
        OutputFormat::Stl => requested,
        OutputFormat::Glb => true,
        OutputFormat::Gltf | OutputFormat::Obj => false,
    }
}

/// Routes scenes to the engine and stamps the result.
#[derive(Debug, Clone)]
pub struct Exporter {
    engine: Arc<dyn SceneEngine>,
    attribution: AttributionConfig,
}

impl Exporter {
    /// Create an exporter.
    pub fn new(engine: Arc<dyn SceneEngine>, attribution: AttributionConfig) -> Self {
        Self {
            engine,
            attribution,
        }
    }

    /// Encode `scene` as `format`, stamping the credit when `add_attribution`.
    pub async fn export(
        &self,
        scene: &Scene,
        format: OutputFormat,
        binary: bool,
        add_attribution: bool,
    ) -> Result<Vec<u8>, ExportError> {
        let binary = binary_mode(format, binary);
        let encoded = self
            .engine
            .export(scene, format, &EncodeOptions { binary })
            .await?;

        let bytes = match encoded {
            Encoded::Document(mut document) => {
                if add_attribution {
                    attribution::stamp_document(&mut document, &self.attribution);
                }
                document.finish(binary)?
            }
            Encoded::Bytes(bytes) if !add_attribution => bytes,
            Encoded::Bytes(mut bytes) => match format {
                OutputFormat::Stl if binary => {
                    attribution::stamp_binary_stl(&mut bytes, &self.attribution.credit);
                    bytes
                }
                OutputFormat::Stl => attribution::stamp_ascii_stl(bytes, &self.attribution.credit),
                OutputFormat::Obj => attribution::stamp_obj(
                    bytes,
                    &self.attribution.credit,
                    &self.attribution.tagline,
                ),
                OutputFormat::Gltf | OutputFormat::Glb => {
                    let mut document = SceneDocument::parse(&bytes, binary)?;
                    attribution::stamp_document(&mut document, &self.attribution);
                    document.finish(binary)?
                }
            },
        };

        debug!(
            format = %format,
            binary,
            bytes = bytes.len(),
            attributed = add_attribution,
            "Exported scene"
        );
        Ok(bytes)
    }
}
