//! Multi-party behavior of the mutex against an in-memory store.

use distributed_mutex::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

mod common;
use common::{memory_provider, peer};

#[tokio::test]
async fn test_contending_processes_never_overlap() {
    let provider = memory_provider();
    let in_critical = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let provider = peer(&provider);
            let in_critical = in_critical.clone();
            let overlaps = overlaps.clone();
            let completed = completed.clone();
            tokio::spawn(async move {
                let lock = provider.create_lock("counter").unwrap();
                for _ in 0..5 {
                    let handle = lock.acquire(Some(Duration::from_secs(10))).await.unwrap();
                    if in_critical.swap(true, Ordering::SeqCst) {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    in_critical.store(false, Ordering::SeqCst);
                    completed.fetch_add(1, Ordering::SeqCst);
                    handle.release().await.unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.await.unwrap();
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(completed.load(Ordering::SeqCst), 40);
    let lock = provider.create_lock("counter").unwrap();
    assert_eq!(lock.token_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_names_are_independent() {
    let provider = memory_provider();
    let a = provider.create_lock("alpha").unwrap();
    let b = provider.create_lock("beta").unwrap();

    let held_a = a.acquire(Some(Duration::from_millis(100))).await.unwrap();
    let held_b = b.acquire(Some(Duration::from_millis(100))).await.unwrap();

    held_a.release().await.unwrap();
    held_b.release().await.unwrap();
}

#[tokio::test]
async fn test_holder_cannot_reenter() {
    let provider = memory_provider();
    let lock = provider.create_lock("not-reentrant").unwrap();
    let held = lock.acquire(None).await.unwrap();

    let again = lock.acquire(Some(Duration::from_millis(50))).await;
    assert!(matches!(again, Err(LockError::Timeout(_))));

    held.release().await.unwrap();
}

#[tokio::test]
async fn test_panicking_action_still_releases() {
    let provider = memory_provider();
    let other = peer(&provider);

    let task = tokio::spawn(async move {
        other
            .with_lock("panicky", Some(Duration::from_secs(1)), || async {
                if true {
                    panic!("protected action blew up");
                }
                Ok::<(), LockError>(())
            })
            .await
    });
    assert!(task.await.unwrap_err().is_panic());

    let lock = provider.create_lock("panicky").unwrap();
    let handle = lock.acquire(Some(Duration::from_secs(1))).await.unwrap();
    handle.release().await.unwrap();
    assert_eq!(lock.token_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_store_outage_surfaces_from_every_operation() {
    let provider = memory_provider();
    let lock = provider.create_lock("outage").unwrap();
    let handle = lock.acquire(Some(Duration::from_secs(1))).await.unwrap();

    provider.store().set_unavailable(true);
    assert!(lock.ensure().await.unwrap_err().is_store_unavailable());
    assert!(lock.try_acquire().await.err().unwrap().is_store_unavailable());
    assert!(handle.release().await.unwrap_err().is_store_unavailable());
}

#[tokio::test(start_paused = true)]
async fn test_resource_a_across_processes() {
    let x = memory_provider();
    let y = peer(&x);
    let z = peer(&x);

    let x_lock = x.open_lock("resource-A").await.unwrap();
    let x_handle = x_lock.acquire(Some(Duration::from_secs(2))).await.unwrap();

    let started = tokio::time::Instant::now();
    let y_result = y.acquire_lock("resource-A", Some(Duration::from_secs(1))).await;
    assert!(matches!(y_result, Err(LockError::Timeout(_))));
    assert!(started.elapsed() >= Duration::from_secs(1));

    x_handle.release().await.unwrap();

    let started = tokio::time::Instant::now();
    let z_handle = z
        .acquire_lock("resource-A", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    z_handle.release().await.unwrap();
}
