//! Benchmarks the hot per-request fusion path (spec §4.2 steps 3-5): RRF across three
//! ranked lists followed by the heuristic clamp, at a pool size representative of the
//! default `k_rrf` budget.

use cairn_retrieve::fusion::{clamp_to_median_band, heuristic_term, median, rrf_fuse};
use cairn_retrieve::HeuristicWeights;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn ranked_list(n: usize, offset: usize) -> Vec<(u32, f32)> {
    (0..n).map(|i| (((i + offset) % (n * 2)) as u32, 1.0 - (i as f32 / n as f32))).collect()
}

fn bench_rrf_fuse(c: &mut Criterion) {
    let dense = ranked_list(50, 0);
    let bm25_chunk = ranked_list(50, 7);
    let bm25_meta = ranked_list(50, 13);

    c.bench_function("rrf_fuse_three_lists_of_50", |b| {
        b.iter(|| black_box(rrf_fuse(&[&dense, &bm25_chunk, &bm25_meta], 60.0)))
    });
}

fn bench_heuristic_and_clamp(c: &mut Criterion) {
    let weights = HeuristicWeights::default();
    let fused_scores: Vec<f32> = (0..50).map(|i| 1.0 / (60.0 + i as f32)).collect();

    c.bench_function("heuristic_term_and_clamp_over_50_candidates", |b| {
        b.iter(|| {
            let med = median(&fused_scores);
            for score in &fused_scores {
                let raw = heuristic_term(&weights, 0.7, true, true, 0.9);
                black_box(clamp_to_median_band(raw + score, med));
            }
        })
    });
}

criterion_group!(benches, bench_rrf_fuse, bench_heuristic_and_clamp);
criterion_main!(benches);
