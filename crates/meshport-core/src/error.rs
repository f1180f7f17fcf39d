//! Error types shared across Meshport crates.
//!
//! [`ConvertError`] is the only error a caller of the conversion API ever
//! sees. It has exactly three kinds; every crate-internal failure is mapped
//! into one of them via `From` impls in the crate that produces it.

use std::fmt;

use thiserror::Error;

/// Boxed error used as the cause of a [`ConvertError::Conversion`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which of the two format sets a format name was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FormatDirection {
    /// The set of formats that can be loaded.
    Input,
    /// The set of formats that can be exported.
    Output,
}

impl fmt::Display for FormatDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// The conversion error taxonomy.
///
/// Callers should match on the variant; message text is for humans only.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The format is outside the input or output set.
    #[error("Unsupported {direction} format: {format}")]
    UnsupportedFormat {
        /// The format name as supplied by the caller.
        format: String,
        /// The set the format was checked against.
        direction: FormatDirection,
    },

    /// An archive-mesh file carries machine instructions instead of geometry.
    #[error("Sliced {format} files are not supported. Please use unsliced model files.")]
    SlicedFile {
        /// Display name of the archive format.
        format: String,
    },

    /// Any other failure: network, malformed bytes, engine failure,
    /// failed auto-detection.
    #[error("{message}")]
    Conversion {
        /// Human-readable description.
        message: String,
        /// The underlying failure, if any.
        #[source]
        cause: Option<BoxError>,
    },
}

impl ConvertError {
    /// Create an unsupported-format error.
    pub fn unsupported(format: impl Into<String>, direction: FormatDirection) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
            direction,
        }
    }

    /// Create a sliced-file error.
    pub fn sliced(format: impl Into<String>) -> Self {
        Self::SlicedFile {
            format: format.into(),
        }
    }

    /// Create a conversion error without a cause.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
            cause: None,
        }
    }

    /// Wrap an underlying failure as a conversion error.
    pub fn wrap(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Conversion {
            message: format!("Conversion failed: {cause}"),
            cause: Some(Box::new(cause)),
        }
    }

    /// Returns `true` for [`ConvertError::UnsupportedFormat`].
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }

    /// Returns `true` for [`ConvertError::SlicedFile`].
    pub fn is_sliced_file(&self) -> bool {
        matches!(self, Self::SlicedFile { .. })
    }

    /// Returns `true` for [`ConvertError::Conversion`].
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration sources could not be read or deserialized.
    #[error("Configuration error: {0}")]
    Source(#[from] config::ConfigError),

    /// A value is out of its allowed range.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}
