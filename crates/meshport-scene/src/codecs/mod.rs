//! Byte-level codecs for each supported format.
//!
//! Decoders return scenes in node-local space. Encoders that bake
//! geometry (STL, OBJ) read the cached world matrices, so callers resolve
//! world transforms first.

pub mod gltf;
pub mod obj;
pub mod stl;
pub mod threemf;

use crate::error::EngineError;

/// Parse a whitespace token as `f32`, naming the format on failure.
pub(crate) fn parse_f32(format: &'static str, token: Option<&str>) -> Result<f32, EngineError> {
    let token = token.ok_or_else(|| EngineError::malformed(format, "missing number"))?;
    token
        .parse::<f32>()
        .map_err(|_| EngineError::malformed(format, format!("invalid number `{token}`")))
}
