//! Benchmark suite for placement-algo
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use placement_algo::{
    eap_estimate, information, map_estimate, ItemParams, Observation, Prior, SolverOptions,
};

fn sample_observations(n: usize) -> Vec<Observation> {
    (0..n)
        .map(|i| {
            let difficulty = -2.0 + 4.0 * (i as f64 / n.max(1) as f64);
            let params = ItemParams::new(0.8 + 0.05 * (i % 8) as f64, difficulty);
            Observation::new(params, if i % 3 == 0 { 0.0 } else { 1.0 })
        })
        .collect()
}

fn bench_information(c: &mut Criterion) {
    let params = ItemParams::new(1.2, 0.3);
    c.bench_function("information", |b| {
        b.iter(|| information(black_box(0.1), black_box(&params)))
    });
}

fn bench_map_estimate(c: &mut Criterion) {
    let observations = sample_observations(30);
    let prior = Prior::default();
    let options = SolverOptions::default();
    c.bench_function("map_estimate/30", |b| {
        b.iter(|| map_estimate(black_box(&observations), &prior, 0.0, &options))
    });
}

fn bench_eap_estimate(c: &mut Criterion) {
    let observations = sample_observations(30);
    let prior = Prior::default();
    let options = SolverOptions::default();
    c.bench_function("eap_estimate/30", |b| {
        b.iter(|| eap_estimate(black_box(&observations), &prior, &options))
    });
}

criterion_group!(benches, bench_information, bench_map_estimate, bench_eap_estimate);
criterion_main!(benches);
