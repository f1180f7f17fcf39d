//! # meshport-pipeline
//!
//! The conversion pipeline, written against the
//! [`SceneEngine`](meshport_scene::SceneEngine) capability:
//!
//! - **Detector**: input format from URL suffix, content type or file name
//! - **Guard**: rejects sliced 3MF packages before parsing
//! - **Loader / Exporter**: engine dispatch, attribution stamping
//! - **Transform**: scale, axis swap, centering
//! - **Metadata**: counts and bounds of the final scene
//! - **Converter**: single conversions and chunked batches

pub mod attribution;
pub mod batch;
pub mod converter;
pub mod detector;
pub mod diagnostics;
pub mod exporter;
pub mod guard;
pub mod loader;
pub mod metadata;
pub mod metrics;
pub mod models;
pub mod source;
pub mod transform;

pub use converter::Converter;
pub use diagnostics::{CollectingSink, DiagnosticSink, TracingSink};
pub use metrics::MetricsSnapshot;
pub use models::{
    BatchItem, BatchOptions, BatchResult, Blob, BoundingBox, ConversionInput, ConversionOptions,
    ConversionResult, ModelMetadata, OutputRepresentation, ProgressCallback,
};
pub use transform::TransformSpec;
