//! Cache benchmarks
//!
//! Run with: `cargo bench --bench cache_bench -p propdesk-common --features
//! runtime`

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use propdesk_common::cache::{cache_key, TtlCache};
use serde_json::{json, Value};

fn populated(size: usize) -> TtlCache<Value> {
    let cache = TtlCache::new(Duration::from_secs(300));
    for i in 0..size {
        cache.insert(format!("/properties/{i}"), json!({ "id": i }));
    }
    cache
}

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ttl_cache_get_hit");

    for size in [100, 1000, 10_000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let cache = populated(size);
            let mut counter = 0usize;
            b.iter(|| {
                let key = format!("/properties/{}", counter % size);
                let _ = black_box(cache.get(black_box(&key)));
                counter = counter.wrapping_add(1);
            });
        });
    }

    group.finish();
}

fn bench_invalidate_family(c: &mut Criterion) {
    let mut group = c.benchmark_group("ttl_cache_invalidate");

    for size in [100, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || populated(size),
                |cache| black_box(cache.invalidate(Some("properties"))),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_cache_key(c: &mut Criterion) {
    c.bench_function("cache_key_four_params", |b| {
        b.iter(|| {
            cache_key(
                black_box("/properties"),
                [("maxPrice", "500"), ("location", "Miami Beach"), ("guests", "4"), ("minPrice", "100")],
            )
        });
    });
}

criterion_group!(benches, bench_get_hit, bench_invalidate_family, bench_cache_key);
criterion_main!(benches);
