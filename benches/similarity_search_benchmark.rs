use chess_ai_assistant::VectorIndex;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const DIMENSION: usize = 256;

/// Deterministic pseudo-embedding, no RNG needed
fn vector(seed: usize) -> Vec<f32> {
    (0..DIMENSION)
        .map(|i| (((seed * 31 + i * 17) % 97) as f32 / 97.0) - 0.5)
        .collect()
}

fn build_index(size: usize) -> VectorIndex {
    VectorIndex::from_rows((0..size).map(vector).collect()).unwrap()
}

fn bench_search_by_index_size(c: &mut Criterion) {
    let query = vector(12_345);
    let mut group = c.benchmark_group("vector_index_search");

    // Below and above the parallel scan threshold
    for size in [50, 500, 5_000] {
        let index = build_index(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &index, |b, index| {
            b.iter(|| black_box(index.search(black_box(&query), 5)))
        });
    }
    group.finish();
}

fn bench_search_by_k(c: &mut Criterion) {
    let index = build_index(2_000);
    let query = vector(777);
    let mut group = c.benchmark_group("vector_index_top_k");

    for k in [1, 5, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, &k| {
            b.iter(|| black_box(index.search(&query, k)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search_by_index_size, bench_search_by_k);
criterion_main!(benches);
