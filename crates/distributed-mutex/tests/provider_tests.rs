//! Tests for provider abstraction.

use distributed_mutex::prelude::*;
use std::time::Duration;

mod common;
use common::memory_provider;

/// Tests that any provider can be used with the same code.
async fn test_provider_abstraction_with_name<P: LockProvider>(provider: &P, name: &str) {
    let lock = provider.create_lock(name).unwrap();
    assert_eq!(lock.name(), name);

    // Try to acquire the lock
    let handle = lock.try_acquire().await.unwrap();
    assert!(handle.is_some());

    // Release the lock
    handle.unwrap().release().await.unwrap();

    // Now we should be able to acquire it again
    let handle2 = lock.try_acquire().await.unwrap();
    assert!(handle2.is_some());
    handle2.unwrap().release().await.unwrap();
}

/// Tests provider extension methods work with any provider.
async fn test_provider_extensions_with_name<P: LockProvider + LockProviderExt>(
    provider: &P,
    name: &str,
) {
    // Test acquire_lock extension method
    let handle = provider
        .acquire_lock(name, Some(Duration::from_millis(100)))
        .await
        .unwrap();

    // Test try_acquire_lock extension method
    let handle2 = provider.try_acquire_lock(name).await.unwrap();
    // Should be None because lock is held
    assert!(handle2.is_none());

    handle.release().await.unwrap();
}

#[tokio::test]
async fn test_memory_provider_abstraction() {
    let provider = memory_provider();
    test_provider_abstraction_with_name(&provider, "test-resource").await;
}

#[tokio::test]
async fn test_memory_provider_extensions() {
    let provider = memory_provider();
    test_provider_extensions_with_name(&provider, "test-resource-ext").await;
}

#[tokio::test]
async fn test_open_lock_seeds_eagerly() {
    let provider = memory_provider();
    let lock = provider.open_lock("eager").await.unwrap();
    assert_eq!(lock.token_count().await.unwrap(), 1);
    assert!(!lock.ensure().await.unwrap());
}

#[tokio::test]
async fn test_create_lock_is_lazy() {
    let provider = memory_provider();
    let lock = provider.create_lock("lazy").unwrap();
    assert_eq!(lock.token_count().await.unwrap(), 0);

    let handle = lock.acquire(Some(Duration::from_millis(100))).await.unwrap();
    handle.release().await.unwrap();
    assert_eq!(lock.token_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_empty_name_is_rejected() {
    let provider = memory_provider();
    let result = provider.acquire_lock("", None).await;
    assert!(matches!(result, Err(LockError::InvalidName(_))));
}

#[tokio::test]
async fn test_provider_with_lock_propagates_action_error() {
    #[derive(Debug)]
    #[allow(dead_code)]
    enum JobError {
        Lock(LockError),
        Failed,
    }

    impl From<LockError> for JobError {
        fn from(e: LockError) -> Self {
            JobError::Lock(e)
        }
    }

    let provider = memory_provider();
    let result = provider
        .with_lock("job", Some(Duration::from_secs(1)), || async {
            Err::<(), _>(JobError::Failed)
        })
        .await;
    assert!(matches!(result, Err(JobError::Failed)));

    // The lock must be free again
    let lock = provider.create_lock("job").unwrap();
    assert_eq!(lock.token_count().await.unwrap(), 1);
    assert!(!matches!(result, Err(JobError::Lock(_))));
}
