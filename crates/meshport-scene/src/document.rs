//! glTF scene documents: the JSON tree plus binary payload, before the
//! final glTF or GLB serialization.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};

use crate::codecs::gltf::split_glb;
use crate::error::EngineError;

/// GLB file magic, `glTF` little-endian.
pub(crate) const GLB_MAGIC: u32 = 0x4654_6C67;
/// GLB container version.
pub(crate) const GLB_VERSION: u32 = 2;
/// Chunk type of the JSON chunk.
pub(crate) const CHUNK_JSON: u32 = 0x4E4F_534A;
/// Chunk type of the binary chunk.
pub(crate) const CHUNK_BIN: u32 = 0x004E_4942;

/// Prefix of an embedded buffer data URI.
const DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

/// A glTF document whose top-level `buffers[0]` refers to `bin`.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDocument {
    /// The glTF JSON tree.
    pub json: Value,
    /// Payload of buffer 0.
    pub bin: Vec<u8>,
}

impl SceneDocument {
    /// The top-level `asset` object, created when missing.
    ///
    /// Returns `None` only when the document root is not a JSON object.
    pub fn asset_mut(&mut self) -> Option<&mut Map<String, Value>> {
        let root = self.json.as_object_mut()?;
        let asset = root
            .entry("asset")
            .or_insert_with(|| Value::Object(Map::new()));
        if !asset.is_object() {
            *asset = Value::Object(Map::new());
        }
        asset.as_object_mut()
    }

    /// Read serialized glTF JSON, or a GLB container when `binary`.
    pub fn parse(bytes: &[u8], binary: bool) -> Result<Self, EngineError> {
        if binary {
            let (json, bin) = split_glb(bytes)?;
            Ok(Self {
                json: serde_json::from_slice(json)?,
                bin: bin.map(<[u8]>::to_vec).unwrap_or_default(),
            })
        } else {
            let json = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            Ok(Self {
                json: serde_json::from_slice(json)?,
                bin: Vec::new(),
            })
        }
    }

    /// Serialize as glTF JSON or as GLB.
    pub fn finish(self, binary: bool) -> Result<Vec<u8>, EngineError> {
        if binary {
            self.into_glb()
        } else {
            self.into_gltf()
        }
    }

    /// Serialize as glTF JSON, embedding the payload as a data URI.
    pub fn into_gltf(mut self) -> Result<Vec<u8>, EngineError> {
        if !self.bin.is_empty() {
            let uri = format!("{DATA_URI_PREFIX}{}", BASE64.encode(&self.bin));
            if let Some(buffer) = self
                .json
                .get_mut("buffers")
                .and_then(|b| b.get_mut(0))
                .and_then(Value::as_object_mut)
            {
                buffer.insert("uri".to_string(), Value::String(uri));
            }
        }
        Ok(serde_json::to_vec(&self.json)?)
    }

    /// Serialize as a GLB container with 4-byte aligned chunks.
    pub fn into_glb(self) -> Result<Vec<u8>, EngineError> {
        let mut json = serde_json::to_vec(&self.json)?;
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let mut bin = self.bin;
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let bin_chunk_len = if bin.is_empty() { 0 } else { 8 + bin.len() };
        let total = 12 + 8 + json.len() + bin_chunk_len;
        let total = u32::try_from(total)
            .map_err(|_| EngineError::malformed("GLB", "output exceeds 4 GiB"))?;

        let mut out = Vec::with_capacity(total as usize);
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&total.to_le_bytes());

        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(&json);

        if !bin.is_empty() {
            out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
            out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
            out.extend_from_slice(&bin);
        }

        Ok(out)
    }
}

/// Decode an embedded `data:` URI. Returns `None` for other URIs.
pub(crate) fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>, EngineError>> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return Some(Err(EngineError::unsupported(
            "glTF",
            "non-base64 data URI",
        )));
    }
    Some(BASE64.decode(payload).map_err(EngineError::from))
}
