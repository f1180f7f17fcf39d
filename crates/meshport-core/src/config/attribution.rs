//! Attribution strings stamped into exported files.

use serde::{Deserialize, Serialize};

/// Credit text written into encoded output when attribution is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    /// Main credit line. Used for the STL header, the STL `solid` line,
    /// the first OBJ comment and the glTF `asset.copyright` field.
    pub credit: String,
    /// Second OBJ comment line.
    pub tagline: String,
    /// glTF `asset.generator` value.
    pub generator: String,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            credit: "Created using Meshport".to_string(),
            tagline: "Meshport Model Converter".to_string(),
            generator: "Meshport Model Converter".to_string(),
        }
    }
}
