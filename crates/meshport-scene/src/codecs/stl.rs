//! STL, binary and ASCII.

use glam::Vec3;

use super::parse_f32;
use crate::error::EngineError;
use crate::mesh::Mesh;
use crate::scene::{Node, Scene};

const FORMAT: &str = "STL";

/// Size of the binary header.
pub const HEADER_LEN: usize = 80;
/// Header plus the u32 triangle count.
const PREAMBLE_LEN: usize = HEADER_LEN + 4;
/// Normal, three vertices and the attribute word.
const RECORD_LEN: usize = 50;

/// Name written on the `solid` and `endsolid` lines.
const ASCII_SOLID_NAME: &str = "exported";

/// Decode binary or ASCII STL into a single-mesh scene with recomputed
/// normals.
pub fn decode(bytes: &[u8]) -> Result<Scene, EngineError> {
    let mut mesh = if is_binary(bytes) {
        decode_binary(bytes)?
    } else {
        decode_ascii(bytes)?
    };
    mesh.recompute_normals();
    Ok(Scene::from_nodes(vec![Node::with_mesh(mesh)]))
}

/// Whether `bytes` should be read as binary STL.
///
/// An exact size match for the declared triangle count wins. Otherwise
/// the data is ASCII only if `solid` appears within the first bytes.
pub fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() >= PREAMBLE_LEN {
        let count = read_u32(bytes, HEADER_LEN) as usize;
        if count
            .checked_mul(RECORD_LEN)
            .and_then(|n| n.checked_add(PREAMBLE_LEN))
            == Some(bytes.len())
        {
            return true;
        }
    }
    !bytes.windows(5).take(5).any(|w| w == b"solid")
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

fn read_vec3(bytes: &[u8], offset: usize) -> Vec3 {
    let mut xyz = [0f32; 3];
    for (i, v) in xyz.iter_mut().enumerate() {
        let at = offset + i * 4;
        *v = f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    }
    Vec3::from_array(xyz)
}

fn decode_binary(bytes: &[u8]) -> Result<Mesh, EngineError> {
    if bytes.len() < PREAMBLE_LEN {
        return Err(EngineError::malformed(
            FORMAT,
            format!("{} bytes is shorter than the binary header", bytes.len()),
        ));
    }
    let count = read_u32(bytes, HEADER_LEN) as usize;
    let needed = count
        .checked_mul(RECORD_LEN)
        .and_then(|n| n.checked_add(PREAMBLE_LEN))
        .ok_or_else(|| EngineError::malformed(FORMAT, "triangle count overflows"))?;
    if bytes.len() < needed {
        return Err(EngineError::malformed(
            FORMAT,
            format!("{count} triangles need {needed} bytes, got {}", bytes.len()),
        ));
    }

    let mut positions = Vec::with_capacity(count * 3);
    for t in 0..count {
        let record = PREAMBLE_LEN + t * RECORD_LEN;
        for v in 0..3 {
            positions.push(read_vec3(bytes, record + 12 + v * 12));
        }
    }
    Ok(Mesh::new(positions))
}

fn decode_ascii(bytes: &[u8]) -> Result<Mesh, EngineError> {
    let text = String::from_utf8_lossy(bytes);
    let mut positions = Vec::new();
    let mut name = None;

    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("solid") if name.is_none() => {
                let rest: Vec<&str> = tokens.collect();
                if !rest.is_empty() {
                    name = Some(rest.join(" "));
                }
            }
            Some("vertex") => {
                let x = parse_f32(FORMAT, tokens.next())?;
                let y = parse_f32(FORMAT, tokens.next())?;
                let z = parse_f32(FORMAT, tokens.next())?;
                positions.push(Vec3::new(x, y, z));
            }
            _ => {}
        }
    }

    if positions.len() % 3 != 0 {
        return Err(EngineError::malformed(
            FORMAT,
            format!("{} vertices do not form whole facets", positions.len()),
        ));
    }

    let mut mesh = Mesh::new(positions);
    mesh.name = name;
    Ok(mesh)
}

/// World-space triangles of every mesh, with face normals.
fn world_facets(scene: &Scene) -> Vec<(Vec3, [Vec3; 3])> {
    let mut facets = Vec::new();
    scene.for_each_mesh(|mesh, world| {
        for [a, b, c] in mesh.triangles() {
            let (Some(pa), Some(pb), Some(pc)) =
                (mesh.position(a), mesh.position(b), mesh.position(c))
            else {
                continue;
            };
            let (pa, pb, pc) = (
                world.transform_point3(pa),
                world.transform_point3(pb),
                world.transform_point3(pc),
            );
            let normal = (pc - pb).cross(pa - pb).normalize_or_zero();
            facets.push((normal, [pa, pb, pc]));
        }
    });
    facets
}

/// Encode every mesh with world transforms baked in.
pub fn encode(scene: &Scene, binary: bool) -> Result<Vec<u8>, EngineError> {
    let facets = world_facets(scene);
    if binary {
        encode_binary(&facets)
    } else {
        Ok(encode_ascii(&facets))
    }
}

fn encode_binary(facets: &[(Vec3, [Vec3; 3])]) -> Result<Vec<u8>, EngineError> {
    let count = u32::try_from(facets.len())
        .map_err(|_| EngineError::malformed(FORMAT, "too many triangles for binary STL"))?;

    let mut out = Vec::with_capacity(PREAMBLE_LEN + facets.len() * RECORD_LEN);
    out.resize(HEADER_LEN, 0);
    out.extend_from_slice(&count.to_le_bytes());
    for (normal, vertices) in facets {
        for v in std::iter::once(normal).chain(vertices.iter()) {
            for component in v.to_array() {
                out.extend_from_slice(&component.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    Ok(out)
}

fn encode_ascii(facets: &[(Vec3, [Vec3; 3])]) -> Vec<u8> {
    let mut out = format!("solid {ASCII_SOLID_NAME}\n");
    for (n, vertices) in facets {
        out.push_str(&format!("\tfacet normal {} {} {}\n", n.x, n.y, n.z));
        out.push_str("\t\touter loop\n");
        for v in vertices {
            out.push_str(&format!("\t\t\tvertex {} {} {}\n", v.x, v.y, v.z));
        }
        out.push_str("\t\tendloop\n");
        out.push_str("\tendfacet\n");
    }
    out.push_str(&format!("endsolid {ASCII_SOLID_NAME}\n"));
    out.into_bytes()
}
