//! Format tags: what can be loaded, what can be exported.
//!
//! The two sets are deliberately separate enums. `3mf` can only be loaded,
//! so it exists in [`InputFormat`] but not in [`OutputFormat`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, FormatDirection};

/// Alternative MIME type some tools use for STL.
const STL_MIME_ALT: &str = "application/sla";

/// Package content type registered for 3MF.
const THREEMF_MIME_ALT: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";

/// Lowercase extension of a file name or path, without the dot.
fn extension_of(name: &str) -> Option<String> {
    let file = name.rsplit(['/', '\\']).next()?;
    let (_, ext) = file.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

// ---------------------------------------------------------------------------
// InputFormat
// ---------------------------------------------------------------------------

/// Formats that can be loaded into a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Binary glTF container (.glb)
    Glb,
    /// JSON glTF container (.gltf)
    Gltf,
    /// Wavefront OBJ (.obj)
    Obj,
    /// Stereolithography, binary or ASCII (.stl)
    Stl,
    /// 3D Manufacturing Format package (.3mf)
    #[serde(rename = "3mf")]
    ThreeMf,
}

impl InputFormat {
    /// Every loadable format.
    pub const ALL: [InputFormat; 5] = [
        InputFormat::Glb,
        InputFormat::Gltf,
        InputFormat::Obj,
        InputFormat::Stl,
        InputFormat::ThreeMf,
    ];

    /// Canonical file extension (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Gltf => "gltf",
            Self::Obj => "obj",
            Self::Stl => "stl",
            Self::ThreeMf => "3mf",
        }
    }

    /// Primary MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Glb => "model/gltf-binary",
            Self::Gltf => "model/gltf+json",
            Self::Obj => "model/obj",
            Self::Stl => "model/stl",
            Self::ThreeMf => "model/3mf",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Glb => "GLB",
            Self::Gltf => "glTF",
            Self::Obj => "OBJ",
            Self::Stl => "STL",
            Self::ThreeMf => "3MF",
        }
    }

    /// Match a bare extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "glb" => Some(Self::Glb),
            "gltf" => Some(Self::Gltf),
            "obj" => Some(Self::Obj),
            "stl" => Some(Self::Stl),
            "3mf" => Some(Self::ThreeMf),
            _ => None,
        }
    }

    /// Match the suffix of a file name, path or URL path.
    pub fn from_file_name(name: &str) -> Option<Self> {
        extension_of(name).and_then(|ext| Self::from_extension(&ext))
    }

    /// Match a declared content type. Parameters (`; charset=...`) are ignored.
    pub fn from_mime_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "model/gltf-binary" => Some(Self::Glb),
            "model/gltf+json" => Some(Self::Gltf),
            "model/obj" => Some(Self::Obj),
            "model/stl" | STL_MIME_ALT => Some(Self::Stl),
            "model/3mf" | THREEMF_MIME_ALT => Some(Self::ThreeMf),
            _ => None,
        }
    }

    /// The same format in the output set, if it can be exported.
    pub fn as_output(&self) -> Option<OutputFormat> {
        match self {
            Self::Glb => Some(OutputFormat::Glb),
            Self::Gltf => Some(OutputFormat::Gltf),
            Self::Obj => Some(OutputFormat::Obj),
            Self::Stl => Some(OutputFormat::Stl),
            Self::ThreeMf => None,
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for InputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim().trim_start_matches('.'))
            .ok_or_else(|| ConvertError::unsupported(s, FormatDirection::Input))
    }
}

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// Formats a scene can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Stereolithography, binary or ASCII (.stl)
    Stl,
    /// Wavefront OBJ (.obj)
    Obj,
    /// JSON glTF container (.gltf)
    Gltf,
    /// Binary glTF container (.glb)
    Glb,
}

impl OutputFormat {
    /// Every exportable format.
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Stl,
        OutputFormat::Obj,
        OutputFormat::Gltf,
        OutputFormat::Glb,
    ];

    /// Canonical file extension (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Stl => "stl",
            Self::Obj => "obj",
            Self::Gltf => "gltf",
            Self::Glb => "glb",
        }
    }

    /// MIME type attached to encoded output.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Stl => "model/stl",
            Self::Obj => "model/obj",
            Self::Gltf => "model/gltf+json",
            Self::Glb => "model/gltf-binary",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Stl => "STL",
            Self::Obj => "OBJ",
            Self::Gltf => "glTF",
            Self::Glb => "GLB",
        }
    }

    /// Match a bare extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "stl" => Some(Self::Stl),
            "obj" => Some(Self::Obj),
            "gltf" => Some(Self::Gltf),
            "glb" => Some(Self::Glb),
            _ => None,
        }
    }

    /// Whether the exported bytes use the glTF scene-document model.
    pub fn is_scene_container(&self) -> bool {
        matches!(self, Self::Gltf | Self::Glb)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim().trim_start_matches('.'))
            .ok_or_else(|| ConvertError::unsupported(s, FormatDirection::Output))
    }
}

impl From<OutputFormat> for InputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Stl => InputFormat::Stl,
            OutputFormat::Obj => InputFormat::Obj,
            OutputFormat::Gltf => InputFormat::Gltf,
            OutputFormat::Glb => InputFormat::Glb,
        }
    }
}

impl TryFrom<InputFormat> for OutputFormat {
    type Error = ConvertError;

    fn try_from(format: InputFormat) -> Result<Self, Self::Error> {
        format
            .as_output()
            .ok_or_else(|| ConvertError::unsupported(format.extension(), FormatDirection::Output))
    }
}
