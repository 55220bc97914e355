//! Session Accumulation Performance Benchmark
//!
//! Measures fixation stream throughput of the single-pass accumulator and the
//! cost of the density classifier.
//!
//! **Goal:** A five-minute session (~2000 fixations) accumulates in well
//! under a millisecond; the density grid dominates when enabled.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eyescalar_common::config::ExtractionConfig;
use eyescalar_extract::density;
use eyescalar_extract::region::{RegionClassifier, Side};
use eyescalar_extract::report::FixationRecord;
use eyescalar_extract::session::SessionAccumulator;

/// Synthetic image/disc alternation with an occasional overlong gap
fn synthetic_session(fixations: usize) -> Vec<FixationRecord> {
    let tags = ["image", "R", "image", "L", "image", "white"];
    let mut time = 0;
    (0..fixations)
        .map(|i| {
            let current = tags[i % tags.len()];
            let (x, y) = match current {
                "R" => (920.0 + (i % 7) as f64, 380.0 + (i % 5) as f64),
                "L" => (104.0 - (i % 7) as f64, 388.0 - (i % 5) as f64),
                "image" => (512.0 + (i % 40) as f64, 384.0 - (i % 30) as f64),
                _ => (600.0, 700.0 - (i % 11) as f64),
            };
            let record = FixationRecord {
                session_label: "vp35.1".to_string(),
                raw_time: time,
                current_tag: current.to_string(),
                previous_tag: tags[(i + tags.len() - 1) % tags.len()].to_string(),
                next_tag: tags[(i + 1) % tags.len()].to_string(),
                duration: 120,
                x,
                y,
            };
            time += if i % 97 == 96 { 900 } else { 150 };
            record
        })
        .collect()
}

fn bench_accumulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_accumulate");
    let config = ExtractionConfig::default();
    let classifier = RegionClassifier::new(&config.markers);

    for fixations in [500usize, 2_000, 10_000] {
        let records = synthetic_session(fixations);
        group.bench_with_input(BenchmarkId::from_parameter(fixations), &records, |b, records| {
            b.iter(|| {
                let mut accumulator = SessionAccumulator::new("35.1", &config);
                for record in records {
                    accumulator.push(black_box(record), &classifier);
                }
                black_box(accumulator.finish())
            });
        });
    }

    group.finish();
}

fn bench_density(c: &mut Criterion) {
    let mut group = c.benchmark_group("density_classifier");
    group.sample_size(10);

    let config = ExtractionConfig::default();
    let classifier = RegionClassifier::new(&config.markers);
    let mut accumulator = SessionAccumulator::new("35.1", &config);
    for record in &synthetic_session(2_000) {
        accumulator.push(record, &classifier);
    }
    let finished = accumulator.finish();

    group.bench_function("classify_session_2000", |b| {
        b.iter(|| black_box(density::classify_session(&finished.samples, Side::Right)));
    });

    group.finish();
}

criterion_group!(benches, bench_accumulate, bench_density);
criterion_main!(benches);
