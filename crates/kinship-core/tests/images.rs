//! Image signal handling through the engine

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use kinship_core::config::EngineConfig;
use kinship_core::store::{FsImageResolver, MemoryImageResolver};
use kinship_core::{CancellationToken, CorrelationEngine, NoteRecord, Thresholds};

fn png(f: impl Fn(u32, u32) -> u8) -> Vec<u8> {
    let img = GrayImage::from_fn(64, 64, |x, y| Luma([f(x, y)]));
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn rising() -> Vec<u8> {
    png(|x, _| (x * 4) as u8)
}

fn falling() -> Vec<u8> {
    png(|x, _| 255 - (x * 4) as u8)
}

fn engine_with(resolver: MemoryImageResolver) -> CorrelationEngine {
    CorrelationEngine::new(EngineConfig::default(), Arc::new(resolver)).unwrap()
}

#[test]
fn test_identical_images_share_a_fingerprint() {
    let mut resolver = MemoryImageResolver::new();
    resolver.insert("scan-1.png", rising());
    resolver.insert("scan-1-copy.png", rising());
    let engine = engine_with(resolver);

    let a = NoteRecord::new("a", "receipt").with_image("scan-1.png");
    let b = NoteRecord::new("b", "receipt").with_image("scan-1-copy.png");
    let score = engine.evaluate(&a, &b).unwrap();

    assert_eq!(score.breakdown.image, Some(1.0));
    assert_eq!(score.score, 1.0);
    assert_eq!(engine.metrics().fingerprint_misses(), 1);
    assert_eq!(engine.metrics().fingerprint_hits(), 1);
}

#[test]
fn test_opposite_images_lower_the_score() {
    let mut resolver = MemoryImageResolver::new();
    resolver.insert("up.png", rising());
    resolver.insert("down.png", falling());
    let engine = engine_with(resolver);

    let a = NoteRecord::new("a", "whiteboard").with_image("up.png");
    let b = NoteRecord::new("b", "whiteboard").with_image("down.png");
    let score = engine.evaluate(&a, &b).unwrap();

    assert_eq!(score.breakdown.image, Some(0.0));
    assert!(score.score < 1.0);
}

#[test]
fn test_corrupt_image_falls_back_to_text_and_tags() {
    let mut resolver = MemoryImageResolver::new();
    resolver.insert("good.png", rising());
    resolver.insert("corrupt.png", b"\x89PNG\r\n\x1a\nnot really".to_vec());
    let engine = engine_with(resolver);

    let notes = vec![
        NoteRecord::new("a", "same words").with_image("good.png"),
        NoteRecord::new("b", "same words").with_image("corrupt.png"),
        NoteRecord::new("c", "same words").with_image("nowhere.png"),
    ];
    let analysis = engine
        .analyze(&notes, Thresholds::default(), &CancellationToken::new())
        .unwrap();

    // Bad images never abort the batch or drag scores down
    assert_eq!(analysis.duplicates.len(), 1);
    assert_eq!(analysis.duplicates[0].note_ids, vec!["a", "b", "c"]);
    assert!(analysis.graph.edges.iter().all(|e| e.breakdown.image.is_none()));
    assert_eq!(analysis.stats.images_fingerprinted, 1);
    assert_eq!(analysis.stats.images_failed, 2);
}

#[test]
fn test_oversized_image_is_skipped() {
    let mut resolver = MemoryImageResolver::new();
    resolver.insert("big.png", rising());
    resolver.insert("big-copy.png", rising());
    let mut config = EngineConfig::default();
    config.image.max_bytes = 16;
    let engine = CorrelationEngine::new(config, Arc::new(resolver)).unwrap();

    let a = NoteRecord::new("a", "diagram").with_image("big.png");
    let b = NoteRecord::new("b", "diagram").with_image("big-copy.png");
    let score = engine.evaluate(&a, &b).unwrap();

    assert_eq!(score.breakdown.image, None);
    assert_eq!(engine.metrics().image_failures(), 2);
}

#[test]
fn test_filesystem_images_relative_to_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("img")).unwrap();
    std::fs::write(dir.path().join("img/one.png"), rising()).unwrap();
    std::fs::write(dir.path().join("img/two.png"), rising()).unwrap();

    let resolver = FsImageResolver::for_snapshot(&dir.path().join("notes.json"));
    let engine = CorrelationEngine::new(EngineConfig::default(), Arc::new(resolver)).unwrap();

    let a = NoteRecord::new("a", "photo of the harbour").with_image("img/one.png");
    let b = NoteRecord::new("b", "harbour photo").with_image("img/two.png");
    let score = engine.evaluate(&a, &b).unwrap();
    assert_eq!(score.breakdown.image, Some(1.0));
}
