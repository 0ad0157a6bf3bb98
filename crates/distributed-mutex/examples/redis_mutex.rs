//! Example: Using the Redis distributed mutex
//!
//! Run with: `cargo run --example redis_mutex`
//!
//! Requires a Redis server. Set REDIS_URL (and optionally REDIS_DB)
//! or rely on the default `redis://localhost:6379`.

use distributed_mutex::RedisMutexProviderBuilder;
use distributed_mutex::prelude::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("connecting to Redis");
    let provider = RedisMutexProviderBuilder::from_env()?
        .default_timeout(Some(Duration::from_secs(5)))
        .build()
        .await?;

    // Create the lock by name and seed it if this is the first process to use it
    let lock = provider.open_lock("example-resource").await?;
    tracing::info!(lock = lock.name(), queue = lock.queue_key(), "lock ready");

    // Acquire the lock with the configured default timeout
    match lock.acquire_default().await {
        Ok(handle) => {
            tracing::info!("lock acquired, doing work");
            tokio::time::sleep(Duration::from_secs(2)).await;
            handle.release().await?;
            tracing::info!("lock released");
        }
        Err(LockError::Timeout(waited)) => {
            tracing::warn!(?waited, "another process is holding the lock");
        }
        Err(e) => return Err(e.into()),
    }

    // Scoped acquisition: release happens even if the work fails
    let result = provider
        .with_lock("example-resource", Some(Duration::from_secs(5)), || async {
            tracing::info!("inside scoped critical section");
            Ok::<_, LockError>("done")
        })
        .await?;
    tracing::info!(result, "scoped work finished");

    Ok(())
}
