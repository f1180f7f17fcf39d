//! Wavefront OBJ geometry: `v`, `vn`, `f`, `o` and `g`.
//!
//! Texture coordinates and materials are skipped on input and never
//! written.

use glam::{Mat3, Vec3};

use super::parse_f32;
use crate::error::EngineError;
use crate::mesh::Mesh;
use crate::scene::{Node, Scene};

const FORMAT: &str = "OBJ";

/// Geometry collected for one `o`/`g` section.
#[derive(Debug, Default)]
struct Group {
    name: Option<String>,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    missing_normals: bool,
}

impl Group {
    fn named(name: Option<String>) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn into_node(self) -> Option<Node> {
        if self.positions.is_empty() {
            return None;
        }
        let mut mesh = Mesh::new(self.positions);
        mesh.name = self.name.clone();
        if self.missing_normals || self.normals.len() != mesh.position_count() {
            mesh.recompute_normals();
        } else {
            mesh.normals = Some(self.normals);
        }
        let node = Node::with_mesh(mesh);
        Some(match self.name {
            Some(name) => node.named(name),
            None => node,
        })
    }
}

/// Resolve a 1-based or negative (relative) OBJ index against `len`.
fn resolve_index(token: &str, len: usize, line: usize) -> Result<usize, EngineError> {
    let raw: i64 = token.parse().map_err(|_| {
        EngineError::malformed(FORMAT, format!("line {line}: invalid index `{token}`"))
    })?;
    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r as usize - 1),
        r => len.checked_sub(r.unsigned_abs() as usize),
    };
    resolved.filter(|i| *i < len).ok_or_else(|| {
        EngineError::malformed(FORMAT, format!("line {line}: index {raw} out of range"))
    })
}

fn parse_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<Vec3, EngineError> {
    Ok(Vec3::new(
        parse_f32(FORMAT, tokens.next())?,
        parse_f32(FORMAT, tokens.next())?,
        parse_f32(FORMAT, tokens.next())?,
    ))
}

/// Decode OBJ text into one node per non-empty object or group.
pub fn decode(bytes: &[u8]) -> Result<Scene, EngineError> {
    let text = String::from_utf8_lossy(bytes);
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut nodes = Vec::new();
    let mut current = Group::default();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        match keyword {
            "v" => positions.push(parse_vec3(&mut tokens)?),
            "vn" => normals.push(parse_vec3(&mut tokens)?),
            "f" => {
                let mut corners = Vec::new();
                for token in tokens {
                    let mut refs = token.split('/');
                    let v = refs.next().unwrap_or_default();
                    let vn = refs.nth(1).filter(|s| !s.is_empty());
                    let position = positions[resolve_index(v, positions.len(), line_no)?];
                    let normal = match vn {
                        Some(vn) => Some(normals[resolve_index(vn, normals.len(), line_no)?]),
                        None => None,
                    };
                    corners.push((position, normal));
                }
                if corners.len() < 3 {
                    return Err(EngineError::malformed(
                        FORMAT,
                        format!("line {line_no}: face needs at least three vertices"),
                    ));
                }
                for k in 1..corners.len() - 1 {
                    for (position, normal) in [corners[0], corners[k], corners[k + 1]] {
                        current.positions.push(position);
                        match normal {
                            Some(n) => current.normals.push(n),
                            None => current.missing_normals = true,
                        }
                    }
                }
            }
            "o" | "g" => {
                let rest: Vec<&str> = tokens.collect();
                let name = (!rest.is_empty()).then(|| rest.join(" "));
                let finished = std::mem::replace(&mut current, Group::named(name));
                nodes.extend(finished.into_node());
            }
            _ => {}
        }
    }
    nodes.extend(current.into_node());

    Ok(Scene::from_nodes(nodes))
}

/// Encode every mesh with world transforms baked into positions and normals.
pub fn encode(scene: &Scene) -> Vec<u8> {
    let mut out = String::new();
    let mut offset = 1usize;
    let mut mesh_index = 0usize;

    scene.for_each_mesh(|mesh, world| {
        let name = mesh
            .name
            .clone()
            .unwrap_or_else(|| format!("mesh_{mesh_index}"));
        mesh_index += 1;
        out.push_str(&format!("o {name}\n"));

        for p in &mesh.positions {
            let p = world.transform_point3(*p);
            out.push_str(&format!("v {} {} {}\n", p.x, p.y, p.z));
        }

        let normals = mesh
            .normals
            .as_ref()
            .filter(|n| n.len() == mesh.position_count());
        if let Some(normals) = normals {
            let linear = Mat3::from_mat4(world);
            let normal_matrix = if linear.determinant().abs() > f32::EPSILON {
                linear.inverse().transpose()
            } else {
                linear
            };
            for n in normals {
                let n = (normal_matrix * *n).normalize_or_zero();
                out.push_str(&format!("vn {} {} {}\n", n.x, n.y, n.z));
            }
        }

        let count = mesh.position_count();
        for tri in mesh.triangles() {
            if tri.iter().any(|i| *i >= count) {
                continue;
            }
            let [a, b, c] = tri.map(|i| i + offset);
            if normals.is_some() {
                out.push_str(&format!("f {a}//{a} {b}//{b} {c}//{c}\n"));
            } else {
                out.push_str(&format!("f {a} {b} {c}\n"));
            }
        }
        offset += count;
    });

    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# quad
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1 4//1
";

    #[test]
    fn test_fan_triangulation() {
        let scene = decode(QUAD.as_bytes()).expect("decode");
        assert_eq!(scene.mesh_count(), 1);
        let mesh = scene.root.children[0].mesh.as_ref().expect("mesh");
        assert_eq!(mesh.position_count(), 6);
        assert_eq!(mesh.name.as_deref(), Some("quad"));
        assert_eq!(mesh.normals.as_ref().map(Vec::len), Some(6));
    }

    #[test]
    fn test_negative_and_slash_indices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf -3/1 -2/1 -1/1\n";
        let scene = decode(text.as_bytes()).expect("decode");
        let mesh = scene.root.children[0].mesh.as_ref().expect("mesh");
        assert_eq!(mesh.position(2), Some(Vec3::Y));
        assert!(mesh.normals.is_some());
    }

    #[test]
    fn test_groups_split_meshes() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\ng a\nf 1 2 3\ng b\nf 3 2 1\ng empty\n";
        let scene = decode(text.as_bytes()).expect("decode");
        assert_eq!(scene.mesh_count(), 2);
    }

    #[test]
    fn test_out_of_range_index() {
        let text = "v 0 0 0\nf 1 2 3\n";
        assert!(matches!(
            decode(text.as_bytes()),
            Err(EngineError::Malformed { .. })
        ));
    }

    #[test]
    fn test_encode_offsets_and_transform() {
        let tri = || Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        let mut second = Node::with_mesh(tri());
        second.translation = Vec3::new(0.0, 0.0, 2.0);
        let mut scene = Scene::from_nodes(vec![Node::with_mesh(tri()), second]);
        scene.resolve_world_transforms();

        let text = String::from_utf8(encode(&scene)).expect("utf8");
        assert!(text.contains("f 1 2 3\n"));
        assert!(text.contains("f 4 5 6\n"));
        assert!(text.contains("v 0 0 2\n"));

        let decoded = decode(text.as_bytes()).expect("decode");
        assert_eq!(decoded.mesh_count(), 2);
    }
}
