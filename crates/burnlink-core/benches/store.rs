//! Benchmarks for token generation and consumption.
//!
//! Run with: cargo bench -p burnlink-core

use burnlink_core::engine::classify;
use burnlink_core::{MemoryTokenStore, TokenId, TokenStore};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_token_generate(c: &mut Criterion) {
    c.bench_function("token_generate", |b| b.iter(TokenId::generate));
}

fn benchmark_token_parse(c: &mut Criterion) {
    let raw = TokenId::generate().to_string();

    c.bench_function("token_parse", |b| {
        b.iter(|| black_box(&raw).parse::<TokenId>())
    });
}

fn benchmark_create_and_consume(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryTokenStore::new();

    c.bench_function("memory_create_consume", |b| {
        b.to_async(&rt).iter(|| async {
            let id = store.create(black_box("https://example.com/x")).await.unwrap();
            store.consume_if_unused(&id).await.unwrap()
        })
    });
}

fn benchmark_classify(c: &mut Criterion) {
    c.bench_function("classify_payload", |b| {
        b.iter(|| classify(black_box("HTTPS://example.com/path?q=1".to_string())))
    });
}

criterion_group!(
    benches,
    benchmark_token_generate,
    benchmark_token_parse,
    benchmark_create_and_consume,
    benchmark_classify
);
criterion_main!(benches);
