//! # Meshport
//!
//! 3D model conversion between glTF/GLB, OBJ, STL and 3MF (input only).
//!
//! ```no_run
//! use meshport::{ConversionOptions, Converter, InputFormat, MeshportConfig, OutputFormat};
//!
//! # async fn run() -> Result<(), meshport::ConvertError> {
//! let config = MeshportConfig::default();
//! let converter = Converter::native(&config)?;
//! let result = converter
//!     .convert_from_url(
//!         "https://example.com/part.stl",
//!         InputFormat::Stl,
//!         OutputFormat::Glb,
//!         &ConversionOptions::default(),
//!     )
//!     .await?;
//! println!("{} triangles", result.metadata.faces);
//! # Ok(())
//! # }
//! ```

pub use meshport_core::config::{self, MeshportConfig};
pub use meshport_core::telemetry::init_logging;
pub use meshport_core::{
    ConfigError, ConvertError, ConvertResult, FormatDirection, InputFormat, OutputFormat,
};
pub use meshport_pipeline::{
    BatchItem, BatchOptions, BatchResult, Blob, BoundingBox, CollectingSink, ConversionInput,
    ConversionOptions, ConversionResult, Converter, DiagnosticSink, MetricsSnapshot,
    ModelMetadata, OutputRepresentation, ProgressCallback, TracingSink,
};
pub use meshport_scene::{NativeEngine, Scene, SceneEngine};

/// Lower-level building blocks.
pub mod pipeline {
    pub use meshport_pipeline::*;
}

/// Scene model and codecs.
pub mod scene {
    pub use meshport_scene::*;
}

// ---------------------------------------------------------------------------
// Format-pair shortcuts
// ---------------------------------------------------------------------------

macro_rules! format_pair {
    ($($(#[$doc:meta])* $name:ident: $from:ident => $to:ident;)*) => {
        $(
            $(#[$doc])*
            pub async fn $name(
                converter: &Converter,
                input: impl Into<ConversionInput>,
                options: &ConversionOptions,
            ) -> ConvertResult<Blob> {
                converter
                    .convert(&input.into(), InputFormat::$from, OutputFormat::$to, options)
                    .await
                    .map(|result| result.blob)
            }
        )*
    };
}

format_pair! {
    /// GLB to STL.
    glb_to_stl: Glb => Stl;
    /// glTF to STL.
    gltf_to_stl: Gltf => Stl;
    /// OBJ to STL.
    obj_to_stl: Obj => Stl;
    /// STL to OBJ.
    stl_to_obj: Stl => Obj;
    /// STL to GLB.
    stl_to_glb: Stl => Glb;
    /// GLB to OBJ.
    glb_to_obj: Glb => Obj;
    /// OBJ to GLB.
    obj_to_glb: Obj => Glb;
    /// 3MF to STL.
    threemf_to_stl: ThreeMf => Stl;
    /// 3MF to OBJ.
    threemf_to_obj: ThreeMf => Obj;
}

/// STL to glTF JSON. The binary flag is forced off.
pub async fn stl_to_gltf(
    converter: &Converter,
    input: impl Into<ConversionInput>,
    options: &ConversionOptions,
) -> ConvertResult<Blob> {
    let options = ConversionOptions {
        binary: false,
        ..options.clone()
    };
    converter
        .convert(&input.into(), InputFormat::Stl, OutputFormat::Gltf, &options)
        .await
        .map(|result| result.blob)
}

/// Any named input format to STL.
pub async fn any_to_stl(
    converter: &Converter,
    input: impl Into<ConversionInput>,
    input_format: &str,
    options: &ConversionOptions,
) -> ConvertResult<Blob> {
    converter
        .convert_by_name(&input.into(), input_format, OutputFormat::Stl.extension(), options)
        .await
        .map(|result| result.blob)
}

/// Detected input format to STL.
pub async fn auto_to_stl(
    converter: &Converter,
    input: impl Into<ConversionInput>,
    options: &ConversionOptions,
) -> ConvertResult<Blob> {
    converter
        .convert_auto(&input.into(), OutputFormat::Stl, options)
        .await
        .map(|result| result.blob)
}

/// Full conversion result including metadata.
pub async fn convert_with_metadata(
    converter: &Converter,
    input: impl Into<ConversionInput>,
    input_format: InputFormat,
    output_format: OutputFormat,
    options: &ConversionOptions,
) -> ConvertResult<ConversionResult> {
    converter
        .convert(&input.into(), input_format, output_format, options)
        .await
}
