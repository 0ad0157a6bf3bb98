//! Redis mutex handle implementation.

use distributed_mutex_core::error::LockResult;
use distributed_mutex_core::traits::LockHandle;
use tracing::{instrument, warn};

use crate::keys::TOKEN;
use crate::store::{RedisTokenStore, TokenStore};

/// Handle for a held Redis mutex.
///
/// Releasing pushes the token back onto the queue. Dropping the handle
/// without releasing pushes it back from a spawned task, which needs a tokio
/// runtime to be running; outside one the token is lost and the mutex stays
/// held until repaired by hand.
pub struct RedisMutexHandle<S: TokenStore = RedisTokenStore> {
    /// Lock name, for diagnostics.
    name: String,
    /// Token queue key.
    queue: String,
    /// Store client.
    store: S,
    /// Set once the token has been handed back (or the attempt was made).
    released: bool,
}

impl<S: TokenStore> RedisMutexHandle<S> {
    pub(crate) fn new(name: String, queue: String, store: S) -> Self {
        Self {
            name,
            queue,
            store,
            released: false,
        }
    }

    /// Name of the held lock.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S: TokenStore> LockHandle for RedisMutexHandle<S> {
    /// Pushes the token back, waking at most one waiter.
    ///
    /// A failed push is not retried: the store may have applied it anyway, and
    /// a second push would leave two tokens in the queue.
    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.queue, backend = "redis"))]
    async fn release(mut self) -> LockResult<()> {
        self.released = true;
        self.store.push(&self.queue, TOKEN).await
    }
}

impl<S: TokenStore> Drop for RedisMutexHandle<S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let store = self.store.clone();
        let queue = std::mem::take(&mut self.queue);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let name = self.name.clone();
                runtime.spawn(async move {
                    if let Err(e) = store.push(&queue, TOKEN).await {
                        warn!(lock.name = %name, error = %e, "failed to release dropped lock handle");
                    }
                });
            }
            Err(_) => {
                warn!(
                    lock.name = %self.name,
                    "lock handle dropped outside a tokio runtime; token not returned"
                );
            }
        }
    }
}
