//! Sliced 3MF rejection through the full conversion path.

use std::sync::Arc;

use meshport::{
    CollectingSink, ConversionOptions, ConvertError, Converter, InputFormat, NativeEngine,
    OutputFormat,
};

use crate::helpers::{self, TETRA_MODEL_XML};

#[tokio::test]
async fn test_sliced_package_rejected_before_parsing() {
    // The model part is not even valid XML: the guard must fire first.
    let package = helpers::zip_archive(&[
        ("3D/3dmodel.model", b"<model><broken".as_slice()),
        ("Metadata/layer_001.gcode", b"G1 X0 Y0".as_slice()),
    ]);

    let converter = helpers::converter();
    let err = converter
        .convert_from_buffer(
            package,
            InputFormat::ThreeMf,
            OutputFormat::Stl,
            &ConversionOptions::default(),
        )
        .await
        .expect_err("sliced package must be rejected");

    assert!(matches!(err, ConvertError::SlicedFile { .. }));
    assert_eq!(
        err.to_string(),
        "Sliced 3MF files are not supported. Please use unsliced model files."
    );

    let snap = converter.metrics();
    assert_eq!(snap.sliced_rejected, 1);
    assert_eq!(snap.conversions_failed, 1);
}

#[tokio::test]
async fn test_macos_metadata_does_not_count_as_sliced() {
    let package = helpers::zip_archive(&[
        ("3D/3dmodel.model", TETRA_MODEL_XML.as_bytes()),
        ("__MACOSX/Metadata/._plate_1.gcode", b"x".as_slice()),
        (".DS_Store", b"x".as_slice()),
    ]);

    let result = helpers::converter()
        .convert_from_buffer(
            package,
            InputFormat::ThreeMf,
            OutputFormat::Obj,
            &ConversionOptions::default(),
        )
        .await
        .expect("package without toolpaths converts");
    assert_eq!(result.metadata.faces, helpers::TETRA_FACES);
}

#[tokio::test]
async fn test_guard_only_applies_to_3mf() {
    // An OBJ whose group name mentions gcode is still just an OBJ.
    let obj = b"g gcode_preview\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n".to_vec();
    let result = helpers::converter()
        .convert_from_buffer(
            obj,
            InputFormat::Obj,
            OutputFormat::Stl,
            &ConversionOptions::default(),
        )
        .await
        .expect("OBJ is never guarded");
    assert_eq!(result.metadata.faces, 1);
}

#[tokio::test]
async fn test_unreadable_archive_reported_then_fails_as_conversion() {
    let sink = CollectingSink::new();
    let converter = Converter::with_sink(
        &helpers::config(),
        Arc::new(NativeEngine::new()),
        Arc::new(sink.clone()),
    )
    .expect("Failed to build converter");

    let err = converter
        .convert_from_buffer(
            b"definitely not a zip".to_vec(),
            InputFormat::ThreeMf,
            OutputFormat::Stl,
            &ConversionOptions::default(),
        )
        .await
        .expect_err("not a package");

    assert!(err.is_conversion());
    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "slice-guard");
    assert!(entries[0].1.contains("3MF"));
}
