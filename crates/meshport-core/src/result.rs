//! Convenience result type alias for Meshport.

use crate::error::ConvertError;

/// A specialized `Result` type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;
