use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use serveme::{
    cache::{CacheKeyMode, ResponseCache},
    templates, HttpRequestMethod,
};

fn cache_put_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_put");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut cache = ResponseCache::new(CacheKeyMode::PathAndMethod);
                let content = Bytes::from("test content");

                for i in 0..size {
                    let path = format!("/path{}", i);
                    cache.put(
                        black_box(HttpRequestMethod::Get),
                        black_box(&path),
                        black_box(content.clone()),
                    );
                }
            });
        });
    }

    group.finish();
}

fn cache_get_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_get");

    for (name, mode) in [
        ("method", CacheKeyMode::Method),
        ("path_and_method", CacheKeyMode::PathAndMethod),
    ]
    .iter()
    {
        group.bench_with_input(BenchmarkId::from_parameter(name), mode, |b, &mode| {
            let mut cache = ResponseCache::new(mode);
            let content = Bytes::from("test content");

            for i in 0..100 {
                let path = format!("/path{}", i);
                cache.put(HttpRequestMethod::Get, &path, content.clone());
            }

            b.iter(|| {
                for i in 0..100 {
                    let path = format!("/path{}", i);
                    let _ = cache.get(black_box(HttpRequestMethod::Get), black_box(&path));
                }
            });
        });
    }

    group.finish();
}

fn cache_get_miss_benchmark(c: &mut Criterion) {
    c.bench_function("cache_get_miss", |b| {
        let mut cache = ResponseCache::new(CacheKeyMode::PathAndMethod);
        cache.put(HttpRequestMethod::Get, "/", Bytes::from("test content"));

        b.iter(|| {
            let _ = cache.get(black_box(HttpRequestMethod::Post), black_box("/nonexistent"));
        });
    });
}

fn render_vs_cached_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_vs_cached");

    for content_size in [1024, 10240, 102400].iter() {
        let body = vec![b'x'; *content_size];
        group.bench_with_input(
            BenchmarkId::new("render", content_size),
            &body,
            |b, body| {
                b.iter(|| templates::ok_html(black_box(body)));
            },
        );

        let mut cache = ResponseCache::new(CacheKeyMode::Method);
        cache.put(HttpRequestMethod::Get, "/", templates::ok_html(&body));
        group.bench_with_input(
            BenchmarkId::new("cached", content_size),
            &cache,
            |b, cache| {
                b.iter(|| cache.get(black_box(HttpRequestMethod::Get), black_box("/")));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    cache_put_benchmark,
    cache_get_benchmark,
    cache_get_miss_benchmark,
    render_vs_cached_benchmark
);
criterion_main!(benches);
