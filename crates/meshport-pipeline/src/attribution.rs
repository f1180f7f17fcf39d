//! Credit stamping into encoded output.
//!
//! Stamps only touch comment or header space: framing lengths and
//! geometry stay as the encoder wrote them.

use serde_json::Value;

use meshport_core::config::attribution::AttributionConfig;
use meshport_scene::SceneDocument;

/// Size of the binary STL header.
pub const STL_HEADER_LEN: usize = 80;

/// Overwrite the start of a binary STL header with `credit`.
///
/// At most `min(len, 80)` bytes are written; the rest of the header and
/// everything after it are left untouched.
pub fn stamp_binary_stl(bytes: &mut [u8], credit: &str) {
    let header = STL_HEADER_LEN.min(bytes.len());
    let n = credit.len().min(header);
    bytes[..n].copy_from_slice(&credit.as_bytes()[..n]);
}

/// Replace a leading `solid ...` line with `solid <credit>`.
///
/// Text that does not start with `solid` is returned unchanged.
pub fn stamp_ascii_stl(bytes: Vec<u8>, credit: &str) -> Vec<u8> {
    if !bytes.starts_with(b"solid") {
        return bytes;
    }
    let line_end = bytes
        .iter()
        .position(|b| *b == b'\n')
        .unwrap_or(bytes.len());

    let mut out = Vec::with_capacity(bytes.len() + credit.len());
    out.extend_from_slice(b"solid ");
    out.extend_from_slice(credit.as_bytes());
    out.extend_from_slice(&bytes[line_end..]);
    out
}

/// Prepend the two-line comment header to OBJ text.
pub fn stamp_obj(bytes: Vec<u8>, credit: &str, tagline: &str) -> Vec<u8> {
    let header = format!("# {credit}\n# {tagline}\n\n");
    let mut out = Vec::with_capacity(header.len() + bytes.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&bytes);
    out
}

/// Set `asset.generator` and `asset.copyright`, creating `asset` if needed.
pub fn stamp_document(document: &mut SceneDocument, attribution: &AttributionConfig) {
    if let Some(asset) = document.asset_mut() {
        asset.insert(
            "generator".to_string(),
            Value::String(attribution.generator.clone()),
        );
        asset.insert(
            "copyright".to_string(),
            Value::String(attribution.credit.clone()),
        );
    }
}
