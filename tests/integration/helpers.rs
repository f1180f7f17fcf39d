//! Shared fixtures for integration tests.

use std::io::{Cursor, Write};

use glam::Vec3;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use zip::write::SimpleFileOptions;

use meshport::scene::{EncodeOptions, Encoded, Mesh, NativeEngine, Node, Scene};
use meshport::{Converter, InputFormat, MeshportConfig, OutputFormat};

/// Faces in [`tetrahedron`].
pub const TETRA_FACES: u64 = 4;

/// Default configuration, except that local test servers are reached
/// directly rather than through an environment proxy.
pub fn config() -> MeshportConfig {
    let mut config = MeshportConfig::default();
    config.fetch.system_proxy = false;
    config
}

/// Converter with the test configuration and the native engine.
pub fn converter() -> Converter {
    Converter::native(&config()).expect("Failed to build converter")
}

/// A 10x20x30 tetrahedron offset from the origin.
pub fn tetrahedron() -> Scene {
    let mesh = Mesh::new(vec![
        Vec3::new(5.0, 5.0, 5.0),
        Vec3::new(15.0, 5.0, 5.0),
        Vec3::new(5.0, 25.0, 5.0),
        Vec3::new(5.0, 5.0, 35.0),
    ])
    .with_indices(vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3])
    .with_name("tetra");
    let mut scene = Scene::from_nodes(vec![Node::with_mesh(mesh).named("tetra")]);
    scene.resolve_world_transforms();
    scene
}

/// 3MF model part describing [`tetrahedron`].
pub const TETRA_MODEL_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="1" type="model">
      <mesh>
        <vertices>
          <vertex x="5" y="5" z="5" />
          <vertex x="15" y="5" z="5" />
          <vertex x="5" y="25" z="5" />
          <vertex x="5" y="5" z="35" />
        </vertices>
        <triangles>
          <triangle v1="0" v2="2" v3="1" />
          <triangle v1="0" v2="1" v3="3" />
          <triangle v1="0" v2="3" v3="2" />
          <triangle v1="1" v2="2" v3="3" />
        </triangles>
      </mesh>
    </object>
  </resources>
  <build>
    <item objectid="1" />
  </build>
</model>"#;

/// Zip archive with the given `(name, body)` entries.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        writer.write_all(body).expect("Failed to write zip entry");
    }
    writer
        .finish()
        .expect("Failed to finish zip")
        .into_inner()
}

/// A printable 3MF package of [`tetrahedron`].
pub fn threemf_package() -> Vec<u8> {
    zip_archive(&[
        ("[Content_Types].xml", b"<Types/>".as_slice()),
        ("3D/3dmodel.model", TETRA_MODEL_XML.as_bytes()),
    ])
}

/// [`tetrahedron`] encoded as `format`.
pub fn fixture(format: InputFormat) -> Vec<u8> {
    let scene = tetrahedron();
    let output = match format {
        InputFormat::ThreeMf => return threemf_package(),
        InputFormat::Stl => OutputFormat::Stl,
        InputFormat::Obj => OutputFormat::Obj,
        InputFormat::Gltf => OutputFormat::Gltf,
        InputFormat::Glb => OutputFormat::Glb,
    };
    match NativeEngine::export_blocking(&scene, output, &EncodeOptions::default())
        .expect("Failed to encode fixture")
    {
        Encoded::Bytes(bytes) => bytes,
        Encoded::Document(doc) => doc
            .finish(output == OutputFormat::Glb)
            .expect("Failed to serialize fixture"),
    }
}

/// Serve a single HTTP response on a local port; returns the base URL.
pub async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(&body).await;
        let _ = socket.shutdown().await;
    });

    format!("http://{addr}")
}
