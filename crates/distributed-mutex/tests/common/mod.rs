//! Shared helpers for integration tests.

#![allow(dead_code)]

use distributed_mutex::{MemoryTokenStore, RedisMutexProvider};
use std::time::Duration;

/// A provider over a fresh in-memory store.
pub fn memory_provider() -> RedisMutexProvider<MemoryTokenStore> {
    RedisMutexProvider::with_store(MemoryTokenStore::new(), Some(Duration::from_secs(2)))
}

/// A second provider sharing `provider`'s store, standing in for another process.
pub fn peer(provider: &RedisMutexProvider<MemoryTokenStore>) -> RedisMutexProvider<MemoryTokenStore> {
    RedisMutexProvider::with_store(provider.store().clone(), provider.default_timeout())
}

/// Helper to get Redis URL from environment or use default.
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

/// A lock name unique to this test run, so reruns against a live server start
/// from an unseeded mutex.
pub fn unique_name(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{prefix}-{}-{nanos}", std::process::id())
}
