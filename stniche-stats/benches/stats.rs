use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stniche_stats::correction::benjamini_hochberg;
use stniche_stats::testing::{mann_whitney_u, mann_whitney_u_with, Alternative};

fn random_f64(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}

fn bench_mann_whitney(c: &mut Criterion) {
    let mut group = c.benchmark_group("mann_whitney");

    let x = random_f64(8, 42);
    let y = random_f64(40, 137);
    group.bench_function("exact_8x40", |b| {
        b.iter(|| mann_whitney_u(black_box(&x), black_box(&y)))
    });

    let x = random_f64(2_000, 42);
    let y = random_f64(2_000, 137);
    group.bench_function("asymptotic_2kx2k_greater", |b| {
        b.iter(|| mann_whitney_u_with(black_box(&x), black_box(&y), Alternative::Greater))
    });

    group.finish();
}

fn bench_bh(c: &mut Criterion) {
    let mut group = c.benchmark_group("benjamini_hochberg");

    let p = random_f64(100_000, 7);
    group.bench_function("100k_pvalues", |b| {
        b.iter(|| benjamini_hochberg(black_box(&p)))
    });

    group.finish();
}

criterion_group!(benches, bench_mann_whitney, bench_bh);
criterion_main!(benches);
