//! Single-conversion tests across formats, transforms and entry points.

use std::error::Error as _;

use bytes::Bytes;

use meshport::{
    Blob, ConversionInput, ConversionOptions, ConvertError, FormatDirection, InputFormat,
    OutputFormat, OutputRepresentation,
};

use crate::helpers::{self, TETRA_FACES};

fn bbox_size(result: &meshport::ConversionResult) -> [f32; 3] {
    result
        .metadata
        .bounding_box
        .expect("Converted scene should have bounds")
        .size
}

fn assert_close(a: [f32; 3], b: [f32; 3]) {
    for i in 0..3 {
        assert!((a[i] - b[i]).abs() < 1e-3, "{a:?} != {b:?}");
    }
}

#[tokio::test]
async fn test_every_supported_pair() {
    let converter = helpers::converter();
    let options = ConversionOptions::default();

    for input_format in InputFormat::ALL {
        let source = helpers::fixture(input_format);
        for output_format in OutputFormat::ALL {
            let result = converter
                .convert_from_buffer(source.clone(), input_format, output_format, &options)
                .await
                .unwrap_or_else(|e| panic!("{input_format} -> {output_format} failed: {e}"));

            assert_eq!(result.metadata.format, output_format);
            assert_eq!(result.metadata.file_size as usize, result.bytes().len());
            assert_eq!(result.metadata.faces, TETRA_FACES, "{input_format} -> {output_format}");
            assert_eq!(
                result.blob.content_type.as_deref(),
                Some(output_format.mime_type())
            );
            assert_close(bbox_size(&result), [10.0, 20.0, 30.0]);
        }
    }
}

#[tokio::test]
async fn test_scale_multiplies_bounding_box() {
    let converter = helpers::converter();
    let source = helpers::fixture(InputFormat::Glb);

    let plain = converter
        .convert_from_buffer(
            source.clone(),
            InputFormat::Glb,
            OutputFormat::Stl,
            &ConversionOptions::default(),
        )
        .await
        .expect("Unscaled conversion failed");
    let scaled = converter
        .convert_from_buffer(
            source,
            InputFormat::Glb,
            OutputFormat::Stl,
            &ConversionOptions {
                scale: 0.5,
                ..Default::default()
            },
        )
        .await
        .expect("Scaled conversion failed");

    let [x, y, z] = bbox_size(&plain);
    assert_close(bbox_size(&scaled), [x * 0.5, y * 0.5, z * 0.5]);
}

#[tokio::test]
async fn test_center_puts_bounds_at_origin() {
    let result = helpers::converter()
        .convert_from_buffer(
            helpers::fixture(InputFormat::Stl),
            InputFormat::Stl,
            OutputFormat::Obj,
            &ConversionOptions {
                center: true,
                scale: 3.0,
                ..Default::default()
            },
        )
        .await
        .expect("Conversion failed");

    let bbox = result.metadata.bounding_box.expect("bounds");
    for i in 0..3 {
        assert!((bbox.min[i] + bbox.max[i]).abs() < 1e-3, "bbox {bbox:?}");
    }
    assert_close(bbox.size, [30.0, 60.0, 90.0]);
}

#[tokio::test]
async fn test_axis_flip_twice_restores_geometry() {
    let converter = helpers::converter();
    let flip = ConversionOptions {
        flip_yz: true,
        add_attribution: false,
        ..Default::default()
    };

    let once = converter
        .convert_from_buffer(
            helpers::fixture(InputFormat::Obj),
            InputFormat::Obj,
            OutputFormat::Obj,
            &flip,
        )
        .await
        .expect("First flip failed");
    assert_close(bbox_size(&once), [10.0, 30.0, 20.0]);

    let twice = converter
        .convert_from_buffer(once.bytes().clone(), InputFormat::Obj, OutputFormat::Obj, &flip)
        .await
        .expect("Second flip failed");

    let bbox = twice.metadata.bounding_box.expect("bounds");
    assert_close(bbox.min, [5.0, 5.0, 5.0]);
    assert_close(bbox.max, [15.0, 25.0, 35.0]);
    assert_eq!(twice.metadata.vertices, once.metadata.vertices);
    assert_eq!(twice.metadata.faces, once.metadata.faces);
}

#[tokio::test]
async fn test_binary_stl_stamp_keeps_length() {
    let converter = helpers::converter();
    let source = helpers::fixture(InputFormat::Glb);

    let stamped = converter
        .convert_from_buffer(
            source.clone(),
            InputFormat::Glb,
            OutputFormat::Stl,
            &ConversionOptions::default(),
        )
        .await
        .expect("Stamped conversion failed");
    let plain = converter
        .convert_from_buffer(
            source,
            InputFormat::Glb,
            OutputFormat::Stl,
            &ConversionOptions {
                add_attribution: false,
                ..Default::default()
            },
        )
        .await
        .expect("Plain conversion failed");

    assert_eq!(stamped.bytes().len(), plain.bytes().len());
    assert_eq!(stamped.bytes().len(), 84 + 50 * TETRA_FACES as usize);
    assert!(stamped.bytes().starts_with(b"Created using Meshport"));
    assert_eq!(stamped.bytes()[80..], plain.bytes()[80..]);
}

#[tokio::test]
async fn test_ascii_stl_and_obj_stamps() {
    let converter = helpers::converter();
    let source = helpers::fixture(InputFormat::Glb);

    let ascii = converter
        .convert_from_buffer(
            source.clone(),
            InputFormat::Glb,
            OutputFormat::Stl,
            &ConversionOptions {
                binary: false,
                ..Default::default()
            },
        )
        .await
        .expect("ASCII STL conversion failed");
    let text = std::str::from_utf8(ascii.bytes()).expect("ASCII STL is UTF-8");
    assert!(text.starts_with("solid Created using Meshport\n"));

    let obj = converter
        .convert_from_buffer(
            source,
            InputFormat::Glb,
            OutputFormat::Obj,
            &ConversionOptions::default(),
        )
        .await
        .expect("OBJ conversion failed");
    assert!(
        obj.bytes()
            .starts_with(b"# Created using Meshport\n# Meshport Model Converter\n\n")
    );
}

#[tokio::test]
async fn test_gltf_output_is_json_with_asset() {
    let result = helpers::converter()
        .convert_from_buffer(
            helpers::fixture(InputFormat::Stl),
            InputFormat::Stl,
            OutputFormat::Gltf,
            &ConversionOptions::default(),
        )
        .await
        .expect("Conversion failed");

    let json: serde_json::Value =
        serde_json::from_slice(result.bytes()).expect("glTF output is JSON");
    assert_eq!(json["asset"]["version"], "2.0");
    assert_eq!(json["asset"]["generator"], "Meshport Model Converter");
    assert_eq!(json["asset"]["copyright"], "Created using Meshport");
}

#[tokio::test]
async fn test_output_representations() {
    let result = helpers::converter()
        .convert_from_buffer(
            helpers::fixture(InputFormat::Stl),
            InputFormat::Stl,
            OutputFormat::Glb,
            &ConversionOptions {
                output: OutputRepresentation::RawBytes,
                ..Default::default()
            },
        )
        .await
        .expect("Conversion failed");
    assert_eq!(result.raw.as_ref(), Some(result.bytes()));
    assert!(result.base64.is_none());
}

#[tokio::test]
async fn test_unknown_output_format_is_unsupported() {
    let converter = helpers::converter();
    let input = ConversionInput::Buffer(Bytes::from(helpers::fixture(InputFormat::Stl)));

    let err = converter
        .convert_by_name(&input, "stl", "fbx", &ConversionOptions::default())
        .await
        .expect_err("fbx output must be rejected");
    assert!(matches!(
        err,
        ConvertError::UnsupportedFormat {
            direction: FormatDirection::Output,
            ..
        }
    ));

    let err = converter
        .convert_by_name(&input, "stl", "3mf", &ConversionOptions::default())
        .await
        .expect_err("3mf is input-only");
    assert!(err.is_unsupported_format());
}

#[tokio::test]
async fn test_malformed_input_keeps_cause() {
    let err = helpers::converter()
        .convert_from_buffer(
            b"{\"asset\": ".to_vec(),
            InputFormat::Gltf,
            OutputFormat::Stl,
            &ConversionOptions::default(),
        )
        .await
        .expect_err("truncated JSON");
    assert!(err.is_conversion());
    assert!(err.source().is_some());
}

#[tokio::test]
async fn test_auto_detects_from_blob_hints() {
    let converter = helpers::converter();

    let named = Blob::new(helpers::fixture(InputFormat::Obj)).with_filename("part.OBJ");
    let result = converter
        .convert_auto(
            &ConversionInput::Blob(named),
            OutputFormat::Stl,
            &ConversionOptions::default(),
        )
        .await
        .expect("Detection by file name failed");
    assert_eq!(result.metadata.faces, TETRA_FACES);

    let typed = Blob::new(helpers::fixture(InputFormat::ThreeMf)).with_content_type("model/3mf");
    let result = converter
        .convert_auto(
            &ConversionInput::Blob(typed),
            OutputFormat::Obj,
            &ConversionOptions::default(),
        )
        .await
        .expect("Detection by content type failed");
    assert_eq!(result.metadata.format, OutputFormat::Obj);
}

#[tokio::test]
async fn test_auto_detection_failure_is_conversion_error() {
    let err = meshport::auto_to_stl(
        &helpers::converter(),
        Bytes::from(helpers::fixture(InputFormat::Stl)),
        &ConversionOptions::default(),
    )
    .await
    .expect_err("raw buffers cannot be detected");
    assert!(err.is_conversion());
    assert!(!err.is_unsupported_format());
}

#[tokio::test]
async fn test_url_source_success() {
    let url = helpers::serve_once("200 OK", helpers::fixture(InputFormat::Stl)).await;
    let result = helpers::converter()
        .convert_from_url(
            format!("{url}/models/part.stl?download=1"),
            InputFormat::Stl,
            OutputFormat::Glb,
            &ConversionOptions::default(),
        )
        .await
        .expect("URL conversion failed");
    assert_eq!(result.metadata.faces, TETRA_FACES);
}

#[tokio::test]
async fn test_url_source_http_error_is_conversion() {
    let url = helpers::serve_once("404 Not Found", b"missing".to_vec()).await;
    let err = helpers::converter()
        .convert_from_url(
            format!("{url}/missing.stl"),
            InputFormat::Stl,
            OutputFormat::Obj,
            &ConversionOptions::default(),
        )
        .await
        .expect_err("404 must fail");
    assert!(err.is_conversion());
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_from_path_input() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("tetra.glb");
    tokio::fs::write(&path, helpers::fixture(InputFormat::Glb))
        .await
        .expect("Failed to write fixture");

    let input = ConversionInput::from_path(&path)
        .await
        .expect("Failed to read fixture");
    let result = helpers::converter()
        .convert_auto(&input, OutputFormat::Stl, &ConversionOptions::default())
        .await
        .expect("Conversion from path failed");
    assert_eq!(result.metadata.faces, TETRA_FACES);
}

#[tokio::test]
async fn test_format_pair_shortcuts() {
    let converter = helpers::converter();
    let options = ConversionOptions::default();

    let gltf = meshport::stl_to_gltf(&converter, helpers::fixture(InputFormat::Stl), &options)
        .await
        .expect("stl_to_gltf failed");
    assert_eq!(gltf.content_type.as_deref(), Some("model/gltf+json"));
    assert_eq!(gltf.data.first(), Some(&b'{'));

    let obj = meshport::glb_to_obj(&converter, helpers::fixture(InputFormat::Glb), &options)
        .await
        .expect("glb_to_obj failed");
    assert_eq!(obj.content_type.as_deref(), Some("model/obj"));

    let stl = meshport::threemf_to_stl(&converter, helpers::threemf_package(), &options)
        .await
        .expect("threemf_to_stl failed");
    assert_eq!(stl.len(), 84 + 50 * TETRA_FACES as usize);

    let err = meshport::any_to_stl(&converter, helpers::fixture(InputFormat::Stl), "fbx", &options)
        .await
        .expect_err("fbx input must be rejected");
    assert!(matches!(
        err,
        ConvertError::UnsupportedFormat {
            direction: FormatDirection::Input,
            ..
        }
    ));

    let full = meshport::convert_with_metadata(
        &converter,
        helpers::fixture(InputFormat::Obj),
        InputFormat::Obj,
        OutputFormat::Glb,
        &options,
    )
    .await
    .expect("convert_with_metadata failed");
    assert_eq!(full.metadata.format, OutputFormat::Glb);
}
