//! glTF 2.0, as JSON or as a GLB container.
//!
//! Decoding covers the node hierarchy and triangle geometry. Materials,
//! textures, skins and animations are ignored.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::document::{CHUNK_BIN, CHUNK_JSON, GLB_MAGIC, SceneDocument, decode_data_uri};
use crate::error::EngineError;
use crate::mesh::Mesh;
use crate::scene::{Node, Scene};

const FORMAT: &str = "glTF";

const COMPONENT_U8: u32 = 5121;
const COMPONENT_U16: u32 = 5123;
const COMPONENT_U32: u32 = 5125;
const COMPONENT_F32: u32 = 5126;

/// Upper bound on elements of an accessor without a buffer view. Such
/// accessors read as zeros, so the count alone would size the allocation.
const MAX_UNBACKED_ELEMENTS: usize = 1 << 20;

const MODE_TRIANGLES: u32 = 4;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

// ---------------------------------------------------------------------------
// Document schema (the subset that is read)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Root {
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<SceneDef>,
    #[serde(default)]
    nodes: Vec<NodeDef>,
    #[serde(default)]
    meshes: Vec<MeshDef>,
    #[serde(default)]
    accessors: Vec<AccessorDef>,
    #[serde(default)]
    buffer_views: Vec<BufferViewDef>,
    #[serde(default)]
    buffers: Vec<BufferDef>,
}

#[derive(Debug, Deserialize)]
struct SceneDef {
    #[serde(default)]
    nodes: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct NodeDef {
    name: Option<String>,
    #[serde(default)]
    children: Vec<usize>,
    mesh: Option<usize>,
    matrix: Option<[f32; 16]>,
    translation: Option<[f32; 3]>,
    rotation: Option<[f32; 4]>,
    scale: Option<[f32; 3]>,
}

#[derive(Debug, Deserialize)]
struct MeshDef {
    name: Option<String>,
    #[serde(default)]
    primitives: Vec<PrimitiveDef>,
}

#[derive(Debug, Deserialize)]
struct PrimitiveDef {
    #[serde(default)]
    attributes: HashMap<String, usize>,
    indices: Option<usize>,
    mode: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessorDef {
    buffer_view: Option<usize>,
    #[serde(default)]
    byte_offset: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    kind: String,
    sparse: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferViewDef {
    buffer: usize,
    #[serde(default)]
    byte_offset: usize,
    byte_length: usize,
    byte_stride: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferDef {
    uri: Option<String>,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Split a GLB container into its JSON chunk and optional BIN chunk.
pub(crate) fn split_glb(bytes: &[u8]) -> Result<(&[u8], Option<&[u8]>), EngineError> {
    let word = |at: usize| -> Result<u32, EngineError> {
        bytes
            .get(at..at + 4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .ok_or_else(|| EngineError::malformed("GLB", "truncated container"))
    };

    if word(0)? != GLB_MAGIC {
        return Err(EngineError::malformed("GLB", "bad magic"));
    }
    let version = word(4)?;
    if version != 2 {
        return Err(EngineError::unsupported("GLB", format!("container version {version}")));
    }
    let end = (word(8)? as usize).min(bytes.len());

    let mut json = None;
    let mut bin = None;
    let mut at = 12;
    while at + 8 <= end {
        let len = word(at)? as usize;
        let kind = word(at + 4)?;
        let body = bytes
            .get(at + 8..at + 8 + len)
            .ok_or_else(|| EngineError::malformed("GLB", "chunk exceeds container"))?;
        match kind {
            CHUNK_JSON if json.is_none() => json = Some(body),
            CHUNK_BIN if bin.is_none() => bin = Some(body),
            _ => {}
        }
        at += 8 + len;
    }

    let json = json.ok_or_else(|| EngineError::malformed("GLB", "missing JSON chunk"))?;
    Ok((json, bin))
}

struct Decoder<'a> {
    root: Root,
    buffers: Vec<std::borrow::Cow<'a, [u8]>>,
}

impl<'a> Decoder<'a> {
    fn new(json: &[u8], glb_bin: Option<&'a [u8]>) -> Result<Self, EngineError> {
        let json = json.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(json);
        let root: Root = serde_json::from_slice(json)?;

        let mut buffers = Vec::with_capacity(root.buffers.len());
        for (i, buffer) in root.buffers.iter().enumerate() {
            let data = match (&buffer.uri, glb_bin) {
                (Some(uri), _) => match decode_data_uri(uri) {
                    Some(decoded) => std::borrow::Cow::Owned(decoded?),
                    None => {
                        return Err(EngineError::unsupported(FORMAT, "external buffer URI"));
                    }
                },
                (None, Some(bin)) if i == 0 => std::borrow::Cow::Borrowed(bin),
                (None, _) => {
                    return Err(EngineError::malformed(
                        FORMAT,
                        format!("buffer {i} has no data"),
                    ));
                }
            };
            buffers.push(data);
        }

        Ok(Self { root, buffers })
    }

    /// Raw element slices of an accessor. `None` entries stand for an
    /// accessor without a buffer view, which reads as zeros.
    fn elements(
        &self,
        index: usize,
        kind: &str,
        allowed: &[u32],
    ) -> Result<(u32, Vec<Option<&[u8]>>), EngineError> {
        let accessor = self
            .root
            .accessors
            .get(index)
            .ok_or_else(|| EngineError::malformed(FORMAT, format!("accessor {index} missing")))?;
        if accessor.sparse.is_some() {
            return Err(EngineError::unsupported(FORMAT, "sparse accessors"));
        }
        if accessor.kind != kind {
            return Err(EngineError::malformed(
                FORMAT,
                format!("accessor {index} is {}, expected {kind}", accessor.kind),
            ));
        }
        if !allowed.contains(&accessor.component_type) {
            return Err(EngineError::unsupported(
                FORMAT,
                format!("component type {} for {kind}", accessor.component_type),
            ));
        }

        let components = if kind == "VEC3" { 3 } else { 1 };
        let component_size = match accessor.component_type {
            COMPONENT_U8 => 1,
            COMPONENT_U16 => 2,
            _ => 4,
        };
        let element_size = components * component_size;

        let Some(view_index) = accessor.buffer_view else {
            if accessor.count > MAX_UNBACKED_ELEMENTS {
                return Err(EngineError::malformed(
                    FORMAT,
                    format!("accessor {index} has {} elements and no data", accessor.count),
                ));
            }
            return Ok((accessor.component_type, vec![None; accessor.count]));
        };
        let view = self.root.buffer_views.get(view_index).ok_or_else(|| {
            EngineError::malformed(FORMAT, format!("buffer view {view_index} missing"))
        })?;
        let buffer = self.buffers.get(view.buffer).ok_or_else(|| {
            EngineError::malformed(FORMAT, format!("buffer {} missing", view.buffer))
        })?;
        let view_bytes = view
            .byte_offset
            .checked_add(view.byte_length)
            .and_then(|end| buffer.get(view.byte_offset..end))
            .ok_or_else(|| {
                EngineError::malformed(FORMAT, format!("buffer view {view_index} out of bounds"))
            })?;

        let stride = view.byte_stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(EngineError::malformed(
                FORMAT,
                format!("buffer view {view_index} stride {stride} is below element size"),
            ));
        }
        let out_of_bounds =
            || EngineError::malformed(FORMAT, format!("accessor {index} out of bounds"));
        if let Some(last) = accessor.count.checked_sub(1) {
            let end = last
                .checked_mul(stride)
                .and_then(|span| span.checked_add(accessor.byte_offset))
                .and_then(|start| start.checked_add(element_size))
                .ok_or_else(out_of_bounds)?;
            if end > view_bytes.len() {
                return Err(out_of_bounds());
            }
        }

        let mut out = Vec::with_capacity(accessor.count);
        for i in 0..accessor.count {
            let start = accessor.byte_offset + i * stride;
            let element = view_bytes
                .get(start..start + element_size)
                .ok_or_else(out_of_bounds)?;
            out.push(Some(element));
        }
        Ok((accessor.component_type, out))
    }

    fn read_vec3(&self, index: usize) -> Result<Vec<Vec3>, EngineError> {
        let (_, elements) = self.elements(index, "VEC3", &[COMPONENT_F32])?;
        Ok(elements
            .into_iter()
            .map(|e| match e {
                Some(b) => Vec3::new(f32_at(b, 0), f32_at(b, 4), f32_at(b, 8)),
                None => Vec3::ZERO,
            })
            .collect())
    }

    fn read_indices(&self, index: usize) -> Result<Vec<u32>, EngineError> {
        let (component, elements) = self.elements(
            index,
            "SCALAR",
            &[COMPONENT_U8, COMPONENT_U16, COMPONENT_U32],
        )?;
        Ok(elements
            .into_iter()
            .map(|e| match (e, component) {
                (None, _) => 0,
                (Some(b), COMPONENT_U8) => u32::from(b[0]),
                (Some(b), COMPONENT_U16) => u32::from(u16::from_le_bytes([b[0], b[1]])),
                (Some(b), _) => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            })
            .collect())
    }

    fn primitive_mesh(&self, primitive: &PrimitiveDef) -> Result<Mesh, EngineError> {
        let position = primitive
            .attributes
            .get("POSITION")
            .ok_or_else(|| EngineError::malformed(FORMAT, "primitive without POSITION"))?;
        let mut mesh = Mesh::new(self.read_vec3(*position)?);

        if let Some(indices) = primitive.indices {
            let indices = self.read_indices(indices)?;
            if let Some(bad) = indices.iter().find(|i| **i as usize >= mesh.position_count()) {
                return Err(EngineError::malformed(
                    FORMAT,
                    format!("index {bad} out of range"),
                ));
            }
            mesh.indices = Some(indices);
        }

        match primitive.attributes.get("NORMAL") {
            Some(normal) => mesh.normals = Some(self.read_vec3(*normal)?),
            None => mesh.recompute_normals(),
        }
        Ok(mesh)
    }

    fn build_node(&self, index: usize, path: &mut Vec<usize>) -> Result<Node, EngineError> {
        if path.contains(&index) {
            return Err(EngineError::malformed(FORMAT, "node hierarchy has a cycle"));
        }
        let def = self
            .root
            .nodes
            .get(index)
            .ok_or_else(|| EngineError::malformed(FORMAT, format!("node {index} missing")))?;

        let mut node = Node::new();
        node.name = def.name.clone();
        if let Some(m) = def.matrix {
            node.set_matrix(Mat4::from_cols_array(&m));
        } else {
            if let Some(t) = def.translation {
                node.translation = Vec3::from_array(t);
            }
            if let Some(r) = def.rotation {
                node.rotation = Quat::from_array(r);
            }
            if let Some(s) = def.scale {
                node.scale = Vec3::from_array(s);
            }
        }

        if let Some(mesh_index) = def.mesh {
            let mesh_def = self.root.meshes.get(mesh_index).ok_or_else(|| {
                EngineError::malformed(FORMAT, format!("mesh {mesh_index} missing"))
            })?;
            let mut meshes = Vec::new();
            for primitive in &mesh_def.primitives {
                let mode = primitive.mode.unwrap_or(MODE_TRIANGLES);
                if mode != MODE_TRIANGLES {
                    warn!(mode, mesh = mesh_index, "Skipping non-triangle primitive");
                    continue;
                }
                let mut mesh = self.primitive_mesh(primitive)?;
                mesh.name = mesh_def.name.clone();
                meshes.push(mesh);
            }
            if meshes.len() == 1 {
                node.mesh = meshes.pop();
            } else {
                node.children
                    .extend(meshes.into_iter().map(Node::with_mesh));
            }
        }

        path.push(index);
        for child in &def.children {
            node.children.push(self.build_node(*child, path)?);
        }
        path.pop();

        Ok(node)
    }

    fn root_nodes(&self) -> Vec<usize> {
        if !self.root.scenes.is_empty() {
            let scene = self.root.scene.unwrap_or(0);
            if let Some(def) = self.root.scenes.get(scene) {
                return def.nodes.clone();
            }
        }
        let mut is_child = vec![false; self.root.nodes.len()];
        for node in &self.root.nodes {
            for child in &node.children {
                if let Some(flag) = is_child.get_mut(*child) {
                    *flag = true;
                }
            }
        }
        (0..self.root.nodes.len()).filter(|i| !is_child[*i]).collect()
    }
}

fn f32_at(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Decode glTF JSON or GLB, chosen by the leading magic.
pub fn decode(bytes: &[u8]) -> Result<Scene, EngineError> {
    let (json, bin) = if bytes.starts_with(b"glTF") {
        split_glb(bytes)?
    } else {
        (bytes, None)
    };
    let decoder = Decoder::new(json, bin)?;

    let mut path = Vec::new();
    let mut nodes = Vec::new();
    for index in decoder.root_nodes() {
        nodes.push(decoder.build_node(index, &mut path)?);
    }
    Ok(Scene::from_nodes(nodes))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Encoder {
    nodes: Vec<Value>,
    meshes: Vec<Value>,
    accessors: Vec<Value>,
    views: Vec<Value>,
    bin: Vec<u8>,
}

impl Encoder {
    fn push_view(&mut self, data: &[u8], target: u32) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let offset = self.bin.len();
        self.bin.extend_from_slice(data);
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": data.len(),
            "target": target,
        }));
        self.views.len() - 1
    }

    fn push_vec3(&mut self, values: &[Vec3], with_bounds: bool) -> usize {
        let data: Vec<u8> = values
            .iter()
            .flat_map(|v| v.to_array())
            .flat_map(f32::to_le_bytes)
            .collect();
        let view = self.push_view(&data, TARGET_ARRAY_BUFFER);
        let mut accessor = json!({
            "bufferView": view,
            "componentType": COMPONENT_F32,
            "count": values.len(),
            "type": "VEC3",
        });
        if with_bounds {
            if let Some(aabb) = crate::bounds::Aabb::from_points(values.iter().copied()) {
                accessor["min"] = json!(aabb.min.to_array());
                accessor["max"] = json!(aabb.max.to_array());
            }
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    fn push_indices(&mut self, indices: &[u32]) -> usize {
        let data: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let view = self.push_view(&data, TARGET_ELEMENT_ARRAY_BUFFER);
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": COMPONENT_U32,
            "count": indices.len(),
            "type": "SCALAR",
        }));
        self.accessors.len() - 1
    }

    fn push_mesh(&mut self, mesh: &Mesh) -> Option<usize> {
        if mesh.positions.is_empty() {
            return None;
        }
        let mut attributes = Map::new();
        attributes.insert("POSITION".into(), json!(self.push_vec3(&mesh.positions, true)));
        if let Some(normals) = mesh
            .normals
            .as_ref()
            .filter(|n| n.len() == mesh.position_count())
        {
            attributes.insert("NORMAL".into(), json!(self.push_vec3(normals, false)));
        }

        let mut primitive = json!({ "attributes": attributes, "mode": MODE_TRIANGLES });
        if let Some(indices) = mesh.indices.as_ref().filter(|i| !i.is_empty()) {
            primitive["indices"] = json!(self.push_indices(indices));
        }

        let mut def = json!({ "primitives": [primitive] });
        if let Some(name) = &mesh.name {
            def["name"] = json!(name);
        }
        self.meshes.push(def);
        Some(self.meshes.len() - 1)
    }

    fn push_node(&mut self, node: &Node) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Value::Null);

        let mut def = Map::new();
        if let Some(name) = &node.name {
            def.insert("name".into(), json!(name));
        }
        if node.translation != Vec3::ZERO {
            def.insert("translation".into(), json!(node.translation.to_array()));
        }
        if node.rotation != Quat::IDENTITY {
            def.insert("rotation".into(), json!(node.rotation.to_array()));
        }
        if node.scale != Vec3::ONE {
            def.insert("scale".into(), json!(node.scale.to_array()));
        }
        if let Some(mesh) = node.mesh.as_ref().and_then(|m| self.push_mesh(m)) {
            def.insert("mesh".into(), json!(mesh));
        }
        let children: Vec<usize> = node.children.iter().map(|c| self.push_node(c)).collect();
        if !children.is_empty() {
            def.insert("children".into(), json!(children));
        }

        self.nodes[index] = Value::Object(def);
        index
    }
}

/// Encode into a scene document. The scene root becomes the single root
/// node of the default scene.
pub fn encode(scene: &Scene) -> Result<SceneDocument, EngineError> {
    let mut encoder = Encoder::default();
    let root = encoder.push_node(&scene.root);

    let mut doc = Map::new();
    doc.insert("asset".into(), json!({ "version": "2.0" }));
    doc.insert("scene".into(), json!(0));
    doc.insert("scenes".into(), json!([{ "nodes": [root] }]));
    doc.insert("nodes".into(), Value::Array(encoder.nodes));
    if !encoder.meshes.is_empty() {
        doc.insert("meshes".into(), Value::Array(encoder.meshes));
        doc.insert("accessors".into(), Value::Array(encoder.accessors));
        doc.insert("bufferViews".into(), Value::Array(encoder.views));
    }
    if !encoder.bin.is_empty() {
        doc.insert("buffers".into(), json!([{ "byteLength": encoder.bin.len() }]));
    }

    Ok(SceneDocument {
        json: Value::Object(doc),
        bin: encoder.bin,
    })
}
