use criterion::{black_box, criterion_group, criterion_main, Criterion};
use circuitguard::prelude::*;
use circuitguard::{check_design, load_design, merge_detections, DetectedCircuit};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn bench_check_design(c: &mut Criterion) {
    let design = load_design(&fixture_path("problems.design.json")).expect("fixture design");
    let options = ValidationOptions::default();

    c.bench_function("check_design", |b| {
        b.iter(|| check_design(black_box(&design), black_box(&options)));
    });
}

fn bench_merge_detections(c: &mut Criterion) {
    let content = std::fs::read_to_string(fixture_path("detections.json")).expect("fixture");
    let photo: Vec<DetectedCircuit> = serde_json::from_str(&content).expect("detections");

    // Twenty photos of the same board.
    let detections: Vec<DetectedCircuit> = (0..20)
        .flat_map(|i| {
            photo.iter().cloned().map(move |mut d| {
                d.source_photo_index = i;
                d
            })
        })
        .collect();

    c.bench_function("merge_detections", |b| {
        b.iter(|| merge_detections(black_box(&detections)));
    });
}

criterion_group!(benches, bench_check_design, bench_merge_detections);
criterion_main!(benches);
