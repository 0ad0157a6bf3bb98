//! In-process [`TokenStore`] with Redis list semantics.
//!
//! Useful for tests and for coordinating tasks inside a single process
//! through the same API that is used against Redis.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use distributed_mutex_core::error::{LockError, LockResult};
use distributed_mutex_core::timeout::TimeoutValue;
use tokio::sync::{Notify, watch};
use tokio::time::Instant;

use crate::store::TokenStore;

#[derive(Default)]
struct State {
    values: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
    signals: HashMap<String, Arc<Notify>>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    unavailable: AtomicBool,
    blocked_pops: AtomicUsize,
}

/// Counts a blocking pop as in flight for as long as it lives.
struct BlockedPop<'a>(&'a AtomicUsize);

impl<'a> BlockedPop<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for BlockedPop<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A [`TokenStore`] kept in memory.
///
/// Clones share the same data, like several clients of one server.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<Inner>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with a connection error until
    /// switched back.
    #[cfg(any(test, feature = "test-util"))]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the plain value stored at `key`, if any.
    #[cfg(any(test, feature = "test-util"))]
    pub fn value(&self, key: &str) -> Option<String> {
        self.state().values.get(key).cloned()
    }

    /// Number of blocking pops currently waiting on the store.
    #[cfg(any(test, feature = "test-util"))]
    pub fn blocked_pops(&self) -> usize {
        self.inner.blocked_pops.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> LockResult<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(LockError::Connection(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "memory store is unavailable",
            ))));
        }
        Ok(())
    }

    fn signal(&self, key: &str) -> Arc<Notify> {
        self.state()
            .signals
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    fn pop_now(&self, key: &str) -> Option<String> {
        let mut state = self.state();
        let list = state.lists.get_mut(key)?;
        let token = list.pop_front();
        if list.is_empty() {
            state.lists.remove(key);
        }
        token
    }
}

impl TokenStore for MemoryTokenStore {
    async fn get_set(&self, key: &str, value: &str) -> LockResult<Option<String>> {
        self.check_available()?;
        Ok(self
            .state()
            .values
            .insert(key.to_string(), value.to_string()))
    }

    async fn push(&self, key: &str, token: &str) -> LockResult<()> {
        self.check_available()?;
        self.state()
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(token.to_string());
        self.signal(key).notify_one();
        Ok(())
    }

    async fn pop(&self, key: &str) -> LockResult<Option<String>> {
        self.check_available()?;
        Ok(self.pop_now(key))
    }

    async fn blocking_pop(
        &self,
        key: &str,
        timeout: TimeoutValue,
        mut abort: watch::Receiver<bool>,
    ) -> LockResult<Option<String>> {
        self.check_available()?;
        let _blocked = BlockedPop::enter(&self.inner.blocked_pops);
        // A deadline past the clock's range waits forever.
        let deadline = timeout
            .as_duration()
            .and_then(|d| Instant::now().checked_add(d));
        let signal = self.signal(key);

        loop {
            // Register interest before looking so a push in between is not missed.
            let notified = signal.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if *abort.borrow() {
                return Ok(None);
            }
            if let Some(token) = self.pop_now(key) {
                return Ok(Some(token));
            }

            let wake = async {
                match deadline {
                    Some(deadline) => tokio::time::timeout_at(deadline, notified).await.is_ok(),
                    None => {
                        notified.await;
                        true
                    }
                }
            };
            tokio::select! {
                woken = wake => {
                    if !woken {
                        return Ok(self.pop_now(key));
                    }
                }
                _ = abort.wait_for(|aborted| *aborted) => return Ok(None),
            }
            self.check_available()?;
        }
    }

    async fn list_len(&self, key: &str) -> LockResult<usize> {
        self.check_available()?;
        Ok(self.state().lists.get(key).map_or(0, VecDeque::len))
    }
}
