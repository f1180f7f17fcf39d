//! 3MF packages: the model part's objects, components and build items.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use glam::{Mat4, Vec3};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::EngineError;
use crate::mesh::Mesh;
use crate::scene::{Node, Scene};

const FORMAT: &str = "3MF";

/// Conventional location of the model part.
const MODEL_PART: &str = "3D/3dmodel.model";

#[derive(Debug, Default)]
struct ObjectDef {
    name: Option<String>,
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    components: Vec<(String, Mat4)>,
}

/// Decode the package's model part into a scene with one node per build
/// item.
pub fn decode(bytes: &[u8]) -> Result<Scene, EngineError> {
    let xml = read_model_part(bytes)?;
    let (objects, items) = parse_model(&xml)?;

    let mut nodes = Vec::with_capacity(items.len());
    let mut path = Vec::new();
    for (object_id, transform) in &items {
        let mut node = object_node(object_id, &objects, &mut path)?;
        node.set_matrix(*transform);
        nodes.push(node);
    }
    Ok(Scene::from_nodes(nodes))
}

fn read_model_part(bytes: &[u8]) -> Result<String, EngineError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let name = archive
        .file_names()
        .find(|n| n.eq_ignore_ascii_case(MODEL_PART))
        .or_else(|| {
            archive
                .file_names()
                .find(|n| n.to_ascii_lowercase().ends_with(".model"))
        })
        .map(str::to_owned)
        .ok_or_else(|| EngineError::malformed(FORMAT, "package has no model part"))?;

    let mut xml = String::new();
    archive.by_name(&name)?.read_to_string(&mut xml)?;
    Ok(xml)
}

fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>, EngineError> {
    let mut out = HashMap::new();
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        out.insert(key, attr.unescape_value()?.into_owned());
    }
    Ok(out)
}

fn required<'m>(attrs: &'m HashMap<String, String>, key: &str) -> Result<&'m str, EngineError> {
    attrs
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| EngineError::malformed(FORMAT, format!("missing `{key}` attribute")))
}

fn number<T: std::str::FromStr>(attrs: &HashMap<String, String>, key: &str) -> Result<T, EngineError> {
    let raw = required(attrs, key)?;
    raw.trim()
        .parse()
        .map_err(|_| EngineError::malformed(FORMAT, format!("invalid `{key}` value `{raw}`")))
}

/// Parse a 3x4 row-vector affine transform. Missing means identity.
fn transform(attrs: &HashMap<String, String>) -> Result<Mat4, EngineError> {
    let Some(raw) = attrs.get("transform") else {
        return Ok(Mat4::IDENTITY);
    };
    let values = raw
        .split_whitespace()
        .map(str::parse::<f32>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| EngineError::malformed(FORMAT, format!("invalid transform `{raw}`")))?;
    let [m00, m01, m02, m10, m11, m12, m20, m21, m22, m30, m31, m32] = values[..] else {
        return Err(EngineError::malformed(
            FORMAT,
            format!("transform needs 12 values, got {}", values.len()),
        ));
    };
    Ok(Mat4::from_cols_array(&[
        m00, m01, m02, 0.0, m10, m11, m12, 0.0, m20, m21, m22, 0.0, m30, m31, m32, 1.0,
    ]))
}

type Objects = HashMap<String, ObjectDef>;
type BuildItems = Vec<(String, Mat4)>;

fn parse_model(xml: &str) -> Result<(Objects, BuildItems), EngineError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut objects = HashMap::new();
    let mut items = Vec::new();
    let mut current: Option<(String, ObjectDef)> = None;

    loop {
        let (element, empty) = match reader.read_event()? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(e) => {
                if e.local_name().as_ref() == b"object" {
                    if let Some((id, object)) = current.take() {
                        objects.insert(id, object);
                    }
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        match element.local_name().as_ref() {
            b"object" => {
                let attrs = attributes(&element)?;
                let object = ObjectDef {
                    name: attrs.get("name").cloned(),
                    ..Default::default()
                };
                let id = required(&attrs, "id")?.to_owned();
                if empty {
                    objects.insert(id, object);
                } else {
                    current = Some((id, object));
                }
            }
            b"vertex" => {
                if let Some((_, object)) = current.as_mut() {
                    let attrs = attributes(&element)?;
                    object.positions.push(Vec3::new(
                        number(&attrs, "x")?,
                        number(&attrs, "y")?,
                        number(&attrs, "z")?,
                    ));
                }
            }
            b"triangle" => {
                if let Some((_, object)) = current.as_mut() {
                    let attrs = attributes(&element)?;
                    for key in ["v1", "v2", "v3"] {
                        object.indices.push(number(&attrs, key)?);
                    }
                }
            }
            b"component" => {
                if let Some((_, object)) = current.as_mut() {
                    let attrs = attributes(&element)?;
                    let target = required(&attrs, "objectid")?.to_owned();
                    object.components.push((target, transform(&attrs)?));
                }
            }
            b"item" => {
                let attrs = attributes(&element)?;
                let target = required(&attrs, "objectid")?.to_owned();
                items.push((target, transform(&attrs)?));
            }
            _ => {}
        }
    }

    Ok((objects, items))
}

fn object_node(id: &str, objects: &Objects, path: &mut Vec<String>) -> Result<Node, EngineError> {
    if path.iter().any(|p| p == id) {
        return Err(EngineError::malformed(FORMAT, "component references form a cycle"));
    }
    let object = objects
        .get(id)
        .ok_or_else(|| EngineError::malformed(FORMAT, format!("object {id} not defined")))?;

    let mut node = Node::new();
    node.name = object.name.clone();

    if !object.positions.is_empty() {
        if let Some(bad) = object
            .indices
            .iter()
            .find(|i| **i as usize >= object.positions.len())
        {
            return Err(EngineError::malformed(
                FORMAT,
                format!("object {id}: vertex index {bad} out of range"),
            ));
        }
        let mut mesh = Mesh::new(object.positions.clone()).with_indices(object.indices.clone());
        mesh.name = object.name.clone();
        mesh.recompute_normals();
        node.mesh = Some(mesh);
    }

    path.push(id.to_owned());
    for (target, matrix) in &object.components {
        let mut child = object_node(target, objects, path)?;
        child.set_matrix(*matrix);
        node.children.push(child);
    }
    path.pop();

    Ok(node)
}
