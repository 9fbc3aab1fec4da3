//! Criterion benchmarks for `mctbn-math`.
//!
//! Focus on the kernels evaluated once per candidate edge during structure search.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mctbn_math::dirichlet::{log_dirichlet_evidence, DirichletParams};
use mctbn_math::{chi_square_sf, f_two_sided_p_value, log_sum_exp};

fn bench_test_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("hypothesis");

    for (name, m_with, m_without) in [
        ("sparse", 4.0, 9.0),
        ("moderate", 60.0, 140.0),
        ("dense", 2_000.0, 5_000.0),
    ] {
        group.bench_with_input(
            BenchmarkId::new("f_two_sided_p_value", name),
            &(m_with, m_without),
            |b, &(mw, mwo)| {
                b.iter(|| {
                    let ratio = 1.3_f64;
                    black_box(f_two_sided_p_value(
                        black_box(ratio),
                        black_box(2.0 * mwo),
                        black_box(2.0 * mw),
                    ));
                });
            },
        );
    }

    for dof in [1.0, 4.0, 30.0] {
        group.bench_with_input(BenchmarkId::new("chi_square_sf", dof), &dof, |b, &k| {
            b.iter(|| black_box(chi_square_sf(black_box(7.5), black_box(k))));
        });
    }

    group.finish();
}

fn bench_scores(c: &mut Criterion) {
    let mut group = c.benchmark_group("scores");

    for k in [2usize, 5, 20] {
        let prior = DirichletParams::symmetric(k, 0.5).unwrap();
        let counts: Vec<f64> = (0..k).map(|i| (i * 7 % 13) as f64).collect();
        group.bench_with_input(
            BenchmarkId::new("log_dirichlet_evidence", k),
            &(prior, counts),
            |b, (p, n)| {
                b.iter(|| black_box(log_dirichlet_evidence(black_box(p), black_box(n))));
            },
        );
    }

    let weights: Vec<f64> = (0..64).map(|i| -(i as f64) * 0.75).collect();
    group.bench_function("log_sum_exp_64", |b| {
        b.iter(|| black_box(log_sum_exp(black_box(&weights))));
    });

    group.finish();
}

criterion_group!(benches, bench_test_statistics, bench_scores);
criterion_main!(benches);
