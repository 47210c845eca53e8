//! Benchmarks for bucket lookup and value accumulation.
//!
//! `bucket_for_value` is the hot-path operation that determines which bucket an
//! observed value falls into. It is a binary search, so we compare a small and a
//! large bucketer and probe values at either end of the range.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use distribution::{Bucketer, Distribution};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

fn entrypoint(c: &mut Criterion) {
    let small = Bucketer::fixed_width(10.0, 5).unwrap();
    let large = Bucketer::default_geometric();

    let mut group = c.benchmark_group("bucket_lookup");

    group.bench_function("small_7_underflow", |b| {
        b.iter(|| small.bucket_for_value(black_box(-1.0)));
    });

    group.bench_function("small_7_overflow", |b| {
        b.iter(|| small.bucket_for_value(black_box(5000.0)));
    });

    group.bench_function("large_102_underflow", |b| {
        b.iter(|| large.bucket_for_value(black_box(-1.0)));
    });

    group.bench_function("large_102_middle", |b| {
        b.iter(|| large.bucket_for_value(black_box(123_456.0)));
    });

    group.bench_function("large_102_overflow", |b| {
        b.iter(|| large.bucket_for_value(black_box(f64::MAX)));
    });

    group.finish();

    let mut group = c.benchmark_group("distribution_add");

    let mut distribution = Distribution::new(Arc::new(Bucketer::default_geometric()));

    group.bench_function("geometric_102", |b| {
        b.iter(|| distribution.add(black_box(250.0)));
    });

    group.finish();
}
