//! Batch conversion: ordering, failure isolation, chunked concurrency.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use meshport::scene::{EncodeOptions, Encoded, EngineError};
use meshport::{
    BatchItem, BatchOptions, ConversionOptions, Converter, InputFormat, NativeEngine,
    OutputFormat, Scene, SceneEngine,
};

use crate::helpers::{self, TETRA_FACES};

/// Delegates to the native engine while recording how many loads overlap.
/// Panics on inputs equal to `b"panic"`.
#[derive(Debug, Default)]
struct CountingEngine {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl SceneEngine for CountingEngine {
    fn name(&self) -> &str {
        "counting"
    }

    async fn load(&self, bytes: Bytes, format: InputFormat) -> Result<Scene, EngineError> {
        if bytes.as_ref() == b"panic" {
            panic!("engine asked to panic");
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let scene = NativeEngine::new().load(bytes, format).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        scene
    }

    async fn export(
        &self,
        scene: &Scene,
        format: OutputFormat,
        options: &EncodeOptions,
    ) -> Result<Encoded, EngineError> {
        NativeEngine::new().export(scene, format, options).await
    }
}

/// What [`TimelineEngine`] saw, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Started(u8),
    Finished(u8),
}

/// Reads the item number from the first header byte of a binary STL and
/// holds item 0 much longer than the rest.
#[derive(Debug, Default)]
struct TimelineEngine {
    events: Mutex<Vec<Event>>,
}

impl TimelineEngine {
    fn log(&self, event: Event) {
        self.events.lock().expect("events lock").push(event);
    }

    fn position(&self, event: Event) -> usize {
        self.events
            .lock()
            .expect("events lock")
            .iter()
            .position(|e| *e == event)
            .unwrap_or_else(|| panic!("{event:?} never happened"))
    }
}

#[async_trait]
impl SceneEngine for TimelineEngine {
    fn name(&self) -> &str {
        "timeline"
    }

    async fn load(&self, bytes: Bytes, format: InputFormat) -> Result<Scene, EngineError> {
        let id = bytes[0];
        self.log(Event::Started(id));
        let delay = if id == 0 { 120 } else { 10 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let scene = NativeEngine::new().load(bytes, format).await;
        self.log(Event::Finished(id));
        scene
    }

    async fn export(
        &self,
        scene: &Scene,
        format: OutputFormat,
        options: &EncodeOptions,
    ) -> Result<Encoded, EngineError> {
        NativeEngine::new().export(scene, format, options).await
    }
}

fn stl_items(count: usize) -> Vec<BatchItem> {
    let stl = helpers::fixture(InputFormat::Stl);
    (0..count)
        .map(|i| BatchItem::new(stl.clone(), InputFormat::Stl).named(format!("item-{i}")))
        .collect()
}

#[tokio::test]
async fn test_batch_keeps_order_and_isolates_failures() {
    let mut items = stl_items(5);
    items[2] = BatchItem::new(b"not a mesh".to_vec(), InputFormat::Stl).named("item-2");

    let options = BatchOptions {
        conversion: ConversionOptions::default(),
        concurrency: Some(2),
    };
    let results = helpers::converter()
        .convert_batch(items, OutputFormat::Obj, &options)
        .await;

    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.item.name.as_deref(), Some(format!("item-{i}").as_str()));
        if i == 2 {
            let err = result.error().expect("malformed item fails");
            assert!(err.is_conversion());
        } else {
            let converted = result.result().expect("valid item converts");
            assert_eq!(converted.metadata.faces, TETRA_FACES);
            assert_eq!(converted.metadata.format, OutputFormat::Obj);
        }
    }
}

#[tokio::test]
async fn test_batch_with_zero_concurrency_uses_default() {
    let converter = helpers::converter();
    assert_eq!(converter.default_concurrency(), 4);

    let options = BatchOptions {
        concurrency: Some(0),
        ..Default::default()
    };
    let results = converter
        .convert_batch(stl_items(6), OutputFormat::Stl, &options)
        .await;

    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r.success()));
}

#[tokio::test]
async fn test_empty_batch_returns_nothing() {
    let results = helpers::converter()
        .convert_batch(Vec::new(), OutputFormat::Glb, &BatchOptions::default())
        .await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_chunks_bound_concurrency() {
    let engine = Arc::new(CountingEngine::default());
    let converter = Converter::new(&helpers::config(), engine.clone() as Arc<dyn SceneEngine>)
        .expect("Failed to build converter");

    let options = BatchOptions {
        concurrency: Some(2),
        ..Default::default()
    };
    let results = converter
        .convert_batch(stl_items(5), OutputFormat::Glb, &options)
        .await;

    assert!(results.iter().all(|r| r.success()));
    assert_eq!(engine.peak.load(Ordering::SeqCst), 2);
    assert_eq!(engine.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_item_becomes_failed_entry() {
    let engine: Arc<dyn SceneEngine> = Arc::new(CountingEngine::default());
    let converter = Converter::new(&helpers::config(), engine).expect("Failed to build converter");

    let mut items = stl_items(3);
    items[1] = BatchItem::new(Bytes::from_static(b"panic"), InputFormat::Stl).named("item-1");

    let options = BatchOptions {
        concurrency: Some(3),
        ..Default::default()
    };
    let results = converter
        .convert_batch(items, OutputFormat::Stl, &options)
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].success());
    assert!(results[2].success());
    assert_eq!(results[1].item.name.as_deref(), Some("item-1"));
    assert!(results[1].error().expect("panic is reported").is_conversion());
}

#[tokio::test]
async fn test_chunks_run_back_to_back_and_results_keep_input_order() {
    let engine = Arc::new(TimelineEngine::default());
    let converter = Converter::new(&helpers::config(), engine.clone() as Arc<dyn SceneEngine>)
        .expect("Failed to build converter");

    let stl = helpers::fixture(InputFormat::Stl);
    let items: Vec<BatchItem> = (0..4u8)
        .map(|i| {
            let mut bytes = stl.clone();
            bytes[0] = i;
            BatchItem::new(bytes, InputFormat::Stl).named(format!("item-{i}"))
        })
        .collect();

    let options = BatchOptions {
        concurrency: Some(2),
        ..Default::default()
    };
    let results = converter
        .convert_batch(items, OutputFormat::Obj, &options)
        .await;

    // The fast item of the first chunk finishes before the slow one.
    assert!(engine.position(Event::Finished(1)) < engine.position(Event::Finished(0)));
    // The second chunk waits for the whole first chunk.
    let first_chunk_done = engine.position(Event::Finished(0));
    assert!(engine.position(Event::Started(2)) > first_chunk_done);
    assert!(engine.position(Event::Started(3)) > first_chunk_done);

    let names: Vec<_> = results
        .iter()
        .map(|r| r.item.name.clone().unwrap_or_default())
        .collect();
    assert_eq!(names, ["item-0", "item-1", "item-2", "item-3"]);
    assert!(results.iter().all(|r| r.success()));
}

#[tokio::test]
async fn test_huge_accessor_count_fails_only_its_item() {
    let gltf = br#"{"asset":{"version":"2.0"},"scenes":[{"nodes":[0]}],"nodes":[{"mesh":0}],
        "meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],
        "accessors":[{"componentType":5126,"count":1000000000000,"type":"VEC3"}]}"#;
    let items = vec![
        BatchItem::new(helpers::fixture(InputFormat::Stl), InputFormat::Stl).named("good"),
        BatchItem::new(gltf.to_vec(), InputFormat::Gltf).named("huge"),
    ];

    let results = helpers::converter()
        .convert_batch(items, OutputFormat::Stl, &BatchOptions::default())
        .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].success());
    assert!(results[1].error().expect("huge count is rejected").is_conversion());
}
