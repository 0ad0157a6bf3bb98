//! Benchmarks for lock acquisition latency

use criterion::{Criterion, criterion_group, criterion_main};
use distributed_mutex_core::prelude::*;
use distributed_mutex_redis::{MemoryTokenStore, RedisMutexProvider};
use std::time::Duration;

fn bench_mutex_acquisition(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let provider = RedisMutexProvider::with_store(MemoryTokenStore::new(), None);
    let lock = provider.create_lock("bench-lock").unwrap();
    runtime.block_on(lock.ensure()).unwrap();

    let mut group = c.benchmark_group("memory_mutex");
    group.bench_function("try_acquire", |b| {
        b.to_async(&runtime).iter(|| async {
            if let Ok(Some(handle)) = lock.try_acquire().await {
                let _ = handle.release().await;
            }
        });
    });

    group.bench_function("acquire_uncontended", |b| {
        b.to_async(&runtime).iter(|| async {
            if let Ok(handle) = lock.acquire(Some(Duration::from_millis(100))).await {
                let _ = handle.release().await;
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_mutex_acquisition);
criterion_main!(benches);
