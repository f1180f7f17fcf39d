//! The single-item conversion orchestrator.

use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use tracing::{info, instrument, warn};

use meshport_core::{ConvertError, ConvertResult, InputFormat, MeshportConfig, OutputFormat};
use meshport_scene::{NativeEngine, SceneEngine};

use crate::detector;
use crate::diagnostics::{SharedSink, default_sink};
use crate::exporter::Exporter;
use crate::guard::SliceGuard;
use crate::loader::Loader;
use crate::metadata;
use crate::metrics::{ConversionMetrics, MetricsSnapshot};
use crate::models::{
    Blob, ConversionInput, ConversionOptions, ConversionResult, ModelMetadata,
    OutputRepresentation,
};
use crate::source::SourceFetcher;
use crate::transform::{self, TransformSpec};

/// Message of the error returned when auto-detection finds nothing.
pub const DETECTION_FAILED: &str = "Could not detect input format. Please specify explicitly.";

/// Composes load, transform, export and metadata into one call.
///
/// Cheap to clone; clones share the HTTP client and the metrics.
#[derive(Debug, Clone)]
pub struct Converter {
    loader: Loader,
    exporter: Exporter,
    metrics: Arc<ConversionMetrics>,
    default_concurrency: usize,
}

impl Converter {
    /// Converter backed by the native engine, reporting diagnostics to
    /// `tracing`.
    pub fn native(config: &MeshportConfig) -> ConvertResult<Self> {
        Self::new(config, Arc::new(NativeEngine::new()))
    }

    /// Converter backed by `engine`.
    pub fn new(config: &MeshportConfig, engine: Arc<dyn SceneEngine>) -> ConvertResult<Self> {
        Self::with_sink(config, engine, default_sink())
    }

    /// Converter backed by `engine`, reporting diagnostics to `sink`.
    pub fn with_sink(
        config: &MeshportConfig,
        engine: Arc<dyn SceneEngine>,
        sink: SharedSink,
    ) -> ConvertResult<Self> {
        let fetcher = SourceFetcher::new(&config.fetch).map_err(ConvertError::wrap)?;
        Ok(Self {
            loader: Loader::new(Arc::clone(&engine), fetcher, SliceGuard::new(sink)),
            exporter: Exporter::new(engine, config.attribution.clone()),
            metrics: Arc::new(ConversionMetrics::new()),
            default_concurrency: config.batch.default_concurrency.max(1),
        })
    }

    /// Current counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Batch chunk size used when the caller gives none.
    pub fn default_concurrency(&self) -> usize {
        self.default_concurrency
    }

    /// Convert `input` from `input_format` to `output_format`.
    ///
    /// Sliced packages fail with [`ConvertError::SlicedFile`]; every other
    /// failure is a [`ConvertError::Conversion`] carrying its cause.
    #[instrument(
        skip(self, input, options),
        fields(source = input.kind(), from = %input_format, to = %output_format)
    )]
    pub async fn convert(
        &self,
        input: &ConversionInput,
        input_format: InputFormat,
        output_format: OutputFormat,
        options: &ConversionOptions,
    ) -> ConvertResult<ConversionResult> {
        self.metrics.record_started();
        let start = Instant::now();

        let outcome = self.run(input, input_format, output_format, options).await;

        match &outcome {
            Ok(result) => {
                let duration = start.elapsed();
                self.metrics
                    .record_success(duration, result.metadata.file_size);
                info!(
                    bytes = result.metadata.file_size,
                    vertices = result.metadata.vertices,
                    faces = result.metadata.faces,
                    duration_ms = duration.as_millis() as u64,
                    "Conversion completed"
                );
            }
            Err(e) => {
                self.metrics.record_failure(e);
                warn!(error = %e, "Conversion failed");
            }
        }
        outcome
    }

    async fn run(
        &self,
        input: &ConversionInput,
        input_format: InputFormat,
        output_format: OutputFormat,
        options: &ConversionOptions,
    ) -> ConvertResult<ConversionResult> {
        let (mut scene, source_len) = self.loader.load(input, input_format).await?;
        self.metrics.record_input(source_len as u64);

        transform::apply(&mut scene, &TransformSpec::from(options));

        let bytes = self
            .exporter
            .export(&scene, output_format, options.binary, options.add_attribution)
            .await?;

        let metadata = metadata::compute(&scene, output_format, bytes.len());
        Ok(assemble(bytes, output_format, options.output, metadata))
    }

    /// Detect the input format, then convert.
    ///
    /// Fails with [`ConvertError::Conversion`] when no hint matches.
    pub async fn convert_auto(
        &self,
        input: &ConversionInput,
        output_format: OutputFormat,
        options: &ConversionOptions,
    ) -> ConvertResult<ConversionResult> {
        let Some(input_format) = detector::detect(input) else {
            warn!(source = input.kind(), "Input format detection failed");
            return Err(ConvertError::conversion(DETECTION_FAILED));
        };
        self.convert(input, input_format, output_format, options)
            .await
    }

    /// Convert with formats given by name, such as `"stl"` or `"3mf"`.
    pub async fn convert_by_name(
        &self,
        input: &ConversionInput,
        input_format: &str,
        output_format: &str,
        options: &ConversionOptions,
    ) -> ConvertResult<ConversionResult> {
        let parsed = input_format
            .parse::<InputFormat>()
            .and_then(|from| Ok((from, output_format.parse::<OutputFormat>()?)));
        let (input_format, output_format) = match parsed {
            Ok(formats) => formats,
            Err(e) => {
                self.metrics.record_started();
                self.metrics.record_failure(&e);
                warn!(error = %e, "Conversion rejected");
                return Err(e);
            }
        };
        self.convert(input, input_format, output_format, options)
            .await
    }

    /// Convert a remote model.
    pub async fn convert_from_url(
        &self,
        url: impl Into<String>,
        input_format: InputFormat,
        output_format: OutputFormat,
        options: &ConversionOptions,
    ) -> ConvertResult<ConversionResult> {
        self.convert(
            &ConversionInput::Url(url.into()),
            input_format,
            output_format,
            options,
        )
        .await
    }

    /// Convert an in-memory blob.
    pub async fn convert_from_blob(
        &self,
        blob: Blob,
        input_format: InputFormat,
        output_format: OutputFormat,
        options: &ConversionOptions,
    ) -> ConvertResult<ConversionResult> {
        self.convert(
            &ConversionInput::Blob(blob),
            input_format,
            output_format,
            options,
        )
        .await
    }

    /// Convert raw bytes.
    pub async fn convert_from_buffer(
        &self,
        bytes: impl Into<Bytes>,
        input_format: InputFormat,
        output_format: OutputFormat,
        options: &ConversionOptions,
    ) -> ConvertResult<ConversionResult> {
        self.convert(
            &ConversionInput::Buffer(bytes.into()),
            input_format,
            output_format,
            options,
        )
        .await
    }
}

/// Build the result with the requested extra representations.
fn assemble(
    bytes: Vec<u8>,
    format: OutputFormat,
    representation: OutputRepresentation,
    metadata: ModelMetadata,
) -> ConversionResult {
    let data = Bytes::from(bytes);
    let raw = match representation {
        OutputRepresentation::Blob => None,
        OutputRepresentation::RawBytes | OutputRepresentation::Base64 => Some(data.clone()),
    };
    let base64 = match representation {
        OutputRepresentation::Base64 => Some(BASE64.encode(&data)),
        _ => None,
    };

    ConversionResult {
        blob: Blob::new(data).with_content_type(format.mime_type()),
        raw,
        base64,
        metadata,
    }
}
