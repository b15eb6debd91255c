//! Nearest-neighbour Benchmarks
//!
//! Measures the per-frame query cost of the sample cache and of a full
//! correction lookup at typical calibration sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gazeshift_lib::config::{Algorithm, CalibrationMode};
use gazeshift_lib::engine::corrector::CorrectionEngine;
use gazeshift_lib::engine::nn_cache::{DenseNeighborCache, NeighborIndex};
use gazeshift_lib::engine::sample::Shift;
use gazeshift_lib::engine::scaler::CoordinateScaler;

/// Deterministic scatter over a 1920x1080 screen, extra axes in 0..100
fn generate_points(count: usize, dimensions: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|i| {
            let mut p = vec![(i * 7919 % 1920) as f32, (i * 104729 % 1080) as f32];
            p.extend((2..dimensions).map(|d| ((i * 31 + d * 17) % 100) as f32));
            p
        })
        .collect()
}

fn bench_cache_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("nn_cache_query");

    for dimensions in [2usize, 16] {
        for count in [500usize, 2000] {
            let points = generate_points(count, dimensions);
            let mut cache = DenseNeighborCache::new(CoordinateScaler::new(&vec![1.0; dimensions]), count);
            for p in &points {
                let i = cache.allocate_index();
                cache.set_coordinates(i, p);
            }
            let query = generate_points(1, dimensions).remove(0);

            group.throughput(Throughput::Elements(count as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{}d", dimensions), count),
                &query,
                |b, query| b.iter(|| black_box(cache.change_cursor_position(black_box(query), 6).len())),
            );
        }
    }

    group.finish();
}

fn bench_get_shift(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_shift");

    for algorithm in [Algorithm::V0, Algorithm::V1, Algorithm::V2] {
        let mode = CalibrationMode {
            zone_size: 0.0,
            max_zones_count: 2000,
            algorithm,
            ..CalibrationMode::default()
        };
        let mut engine = CorrectionEngine::in_memory(&mode);
        for (i, p) in generate_points(2000, 2).iter().enumerate() {
            engine.add_shift(p, Shift::new((i % 40) as i32 - 20, (i % 30) as i32 - 15));
        }

        group.bench_function(format!("{:?}", algorithm), |b| {
            b.iter(|| black_box(engine.get_shift(black_box(&[960.0, 540.0]))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cache_query, bench_get_shift);
criterion_main!(benches);
