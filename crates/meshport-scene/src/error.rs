//! Scene engine error type.

use thiserror::Error;

/// Failures raised while decoding or encoding model bytes.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The bytes do not follow the format's layout.
    #[error("Malformed {format} data: {reason}")]
    Malformed {
        /// Format display name.
        format: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// The data uses a feature this engine does not implement.
    #[error("Unsupported {format} feature: {feature}")]
    Unsupported {
        /// Format display name.
        format: &'static str,
        /// The feature that was encountered.
        feature: String,
    },

    /// JSON error in a glTF document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP container error.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error in a 3MF model part.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid base64 in an embedded buffer.
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking decode task panicked or was cancelled.
    #[error("Engine task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl EngineError {
    /// Shorthand for [`EngineError::Malformed`].
    pub fn malformed(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            format,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`EngineError::Unsupported`].
    pub fn unsupported(format: &'static str, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            format,
            feature: feature.into(),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for EngineError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(quick_xml::Error::from(err))
    }
}
