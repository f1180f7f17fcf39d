//! Domain models: inputs, options, results and batch entries.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use meshport_core::{ConvertError, InputFormat, OutputFormat};
use meshport_scene::Aabb;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// An in-memory binary object with optional type and name hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// The bytes.
    pub data: Bytes,
    /// Declared MIME type, if any.
    pub content_type: Option<String>,
    /// Original file name, if any.
    pub filename: Option<String>,
}

impl Blob {
    /// A blob with no hints.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            content_type: None,
            filename: None,
        }
    }

    /// Set the declared MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the file name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Where the source model comes from. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionInput {
    /// Remote locator fetched with HTTP GET.
    Url(String),
    /// In-memory blob.
    Blob(Blob),
    /// Raw bytes without hints.
    Buffer(Bytes),
}

impl ConversionInput {
    /// Read a local file into a blob input. The file name is kept and the
    /// content type derived from the extension when it is a known format.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;

        let mut blob = Blob::new(data);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Some(format) = InputFormat::from_file_name(name) {
                blob.content_type = Some(format.mime_type().to_string());
            }
            blob.filename = Some(name.to_string());
        }
        Ok(Self::Blob(blob))
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Blob(_) => "blob",
            Self::Buffer(_) => "buffer",
        }
    }
}

impl From<Blob> for ConversionInput {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

impl From<Bytes> for ConversionInput {
    fn from(bytes: Bytes) -> Self {
        Self::Buffer(bytes)
    }
}

impl From<Vec<u8>> for ConversionInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(Bytes::from(bytes))
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Progress observer. Values are in `[0, 1]`.
pub type ProgressCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// Which extra representations of the output to attach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputRepresentation {
    /// Only the blob.
    #[default]
    Blob,
    /// The blob plus raw bytes.
    RawBytes,
    /// The blob, raw bytes and base64 text.
    Base64,
}

/// Per-conversion options.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Binary sub-mode where the output format has one (STL).
    pub binary: bool,
    /// Advisory; the exporters always write normals they have.
    pub include_normals: bool,
    /// Advisory; meshes are never merged.
    pub merge_meshes: bool,
    /// Uniform scale applied at the scene root.
    pub scale: f32,
    /// Move the bounding-box center to the origin.
    pub center: bool,
    /// Swap the Y and Z axes of every vertex.
    pub flip_yz: bool,
    /// Extra output representations.
    pub output: OutputRepresentation,
    /// Stamp the credit into the output.
    pub add_attribution: bool,
    /// Accepted but never called.
    #[serde(skip)]
    pub progress: Option<ProgressCallback>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            binary: true,
            include_normals: true,
            merge_meshes: false,
            scale: 1.0,
            center: false,
            flip_yz: false,
            output: OutputRepresentation::Blob,
            add_attribution: true,
            progress: None,
        }
    }
}

impl fmt::Debug for ConversionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOptions")
            .field("binary", &self.binary)
            .field("include_normals", &self.include_normals)
            .field("merge_meshes", &self.merge_meshes)
            .field("scale", &self.scale)
            .field("center", &self.center)
            .field("flip_yz", &self.flip_yz)
            .field("output", &self.output)
            .field("add_attribution", &self.add_attribution)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Bounding box as reported in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
    /// Extent per axis.
    pub size: [f32; 3],
}

impl From<Aabb> for BoundingBox {
    fn from(aabb: Aabb) -> Self {
        Self {
            min: aabb.min.to_array(),
            max: aabb.max.to_array(),
            size: aabb.size().to_array(),
        }
    }
}

/// Derived facts about the converted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Total vertex count over all meshes.
    pub vertices: u64,
    /// Total triangle count, floored once.
    pub faces: u64,
    /// Length of the encoded output.
    pub file_size: u64,
    /// Output format.
    pub format: OutputFormat,
    /// Bounds after all transforms; `None` for an empty scene.
    pub bounding_box: Option<BoundingBox>,
}

/// Encoded output plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    /// The encoded bytes, typed with the output MIME type.
    pub blob: Blob,
    /// Raw bytes, for the raw-bytes and base64 representations.
    pub raw: Option<Bytes>,
    /// Base64 text, for the base64 representation.
    pub base64: Option<String>,
    /// Derived metadata.
    pub metadata: ModelMetadata,
}

impl ConversionResult {
    /// The encoded bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.blob.data
    }
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// One entry of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// The source.
    pub input: ConversionInput,
    /// Declared input format.
    pub input_format: InputFormat,
    /// Display name for logs and reports.
    pub name: Option<String>,
}

impl BatchItem {
    /// Create an unnamed item.
    pub fn new(input: impl Into<ConversionInput>, input_format: InputFormat) -> Self {
        Self {
            input: input.into(),
            input_format,
            name: None,
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Options for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Applied to every item.
    pub conversion: ConversionOptions,
    /// Chunk size. `None` or `0` means the configured default.
    pub concurrency: Option<usize>,
}

/// Outcome of one batch item.
#[derive(Debug)]
pub struct BatchResult {
    /// The item as submitted.
    pub item: BatchItem,
    /// What happened to it.
    pub outcome: Result<ConversionResult, ConvertError>,
}

impl BatchResult {
    /// Whether the item converted.
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The result, on success.
    pub fn result(&self) -> Option<&ConversionResult> {
        self.outcome.as_ref().ok()
    }

    /// The error, on failure.
    pub fn error(&self) -> Option<&ConvertError> {
        self.outcome.as_ref().err()
    }
}
