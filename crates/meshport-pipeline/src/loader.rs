//! Loader dispatch: source bytes, sliced-file guard, engine decode.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use meshport_core::{ConvertError, InputFormat};
use meshport_scene::{EngineError, Scene, SceneEngine};

use crate::guard::SliceGuard;
use crate::models::ConversionInput;
use crate::source::{SourceError, SourceFetcher};

/// Failures while loading a scene.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The package carries toolpaths instead of geometry.
    #[error("Sliced {0} file")]
    Sliced(InputFormat),

    /// The bytes could not be obtained.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The engine could not parse the bytes.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<LoadError> for ConvertError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Sliced(format) => ConvertError::sliced(format.display_name()),
            other => ConvertError::wrap(other),
        }
    }
}

/// Routes inputs to the scene engine.
#[derive(Debug, Clone)]
pub struct Loader {
    engine: Arc<dyn SceneEngine>,
    fetcher: SourceFetcher,
    guard: SliceGuard,
}

impl Loader {
    /// Create a loader.
    pub fn new(engine: Arc<dyn SceneEngine>, fetcher: SourceFetcher, guard: SliceGuard) -> Self {
        Self {
            engine,
            fetcher,
            guard,
        }
    }

    /// Obtain the bytes, run the guard for 3MF, then decode. The returned
    /// scene has world transforms resolved.
    ///
    /// Returns the scene and the source size in bytes.
    pub async fn load(
        &self,
        input: &ConversionInput,
        format: InputFormat,
    ) -> Result<(Scene, usize), LoadError> {
        let bytes = self.fetcher.read(input).await?;
        let size = bytes.len();

        if format == InputFormat::ThreeMf && self.guard.is_sliced(&bytes) {
            return Err(LoadError::Sliced(format));
        }

        let mut scene = self.engine.load(bytes, format).await?;
        scene.resolve_world_transforms();
        debug!(
            format = %format,
            engine = self.engine.name(),
            bytes = size,
            "Loaded scene"
        );
        Ok((scene, size))
    }
}
