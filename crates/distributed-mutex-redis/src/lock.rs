//! Redis distributed mutex implementation.
//!
//! Each named mutex is a Redis list holding at most one token. A token in the
//! list means the mutex is free; BLPOP takes it and RPUSH gives it back. A
//! separate marker key, set once with GETSET, elects the single process that
//! seeds the list with its first token.

use std::time::Duration;

use distributed_mutex_core::error::{LockError, LockResult};
use distributed_mutex_core::timeout::TimeoutValue;
use distributed_mutex_core::traits::DistributedLock;
use tokio::sync::{OnceCell, oneshot, watch};
use tracing::field::Empty;
use tracing::{Span, debug, instrument, warn};

use crate::handle::RedisMutexHandle;
use crate::keys::{MARKER_SENTINEL, MutexKeys, TOKEN};
use crate::store::{RedisTokenStore, TokenStore};

/// Extra time granted to the store past the requested timeout before the
/// client stops waiting on its own.
const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_millis(500);

type PopResult = LockResult<Option<String>>;

/// How a wait for the token ended.
enum Wait {
    Finished(Result<PopResult, oneshot::error::RecvError>),
    TimedOut,
    Cancelled,
}

/// A distributed mutex backed by a single-token Redis list.
///
/// The mutex is not reentrant: acquiring it again while holding it waits for
/// a token that only this holder can return.
pub struct RedisDistributedMutex<S: TokenStore = RedisTokenStore> {
    /// Original lock name.
    name: String,
    /// Marker and queue keys derived from the name.
    keys: MutexKeys,
    /// Store client.
    store: S,
    /// Timeout used by `acquire_default`.
    default_timeout: Option<Duration>,
    /// Set once this instance has run `ensure` successfully.
    ensured: OnceCell<()>,
}

impl<S: TokenStore> RedisDistributedMutex<S> {
    /// Creates the mutex for `name` without touching the store.
    ///
    /// The backing state is ensured lazily before the first acquisition.
    pub fn new(name: &str, store: S, default_timeout: Option<Duration>) -> LockResult<Self> {
        Ok(Self {
            name: name.to_string(),
            keys: MutexKeys::new(name)?,
            store,
            default_timeout,
            ensured: OnceCell::new(),
        })
    }

    /// Creates the mutex and ensures its backing state right away.
    pub async fn open(name: &str, store: S, default_timeout: Option<Duration>) -> LockResult<Self> {
        let lock = Self::new(name, store, default_timeout)?;
        lock.ensure().await?;
        Ok(lock)
    }

    /// Key of the existence marker.
    pub fn marker_key(&self) -> &str {
        &self.keys.marker
    }

    /// Key of the token queue.
    pub fn queue_key(&self) -> &str {
        &self.keys.queue
    }

    /// Timeout used by [`acquire_default`](Self::acquire_default).
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Number of tokens currently in the queue.
    ///
    /// `1` means free and `0` means held. Anything above `1` means some
    /// caller released without holding the mutex.
    pub async fn token_count(&self) -> LockResult<usize> {
        self.store.list_len(&self.keys.queue).await
    }

    /// Acquires the mutex using the default timeout.
    pub async fn acquire_default(&self) -> LockResult<RedisMutexHandle<S>> {
        self.acquire(self.default_timeout).await
    }

    /// Acquires the mutex, giving up early once `cancel` turns `true`.
    ///
    /// Cancellation yields `LockError::Cancelled`. A token that arrives while
    /// the cancellation is being processed goes back to the queue.
    #[instrument(skip(self, cancel), fields(lock.name = %self.name, lock.key = %self.keys.queue, timeout = ?timeout, backend = "redis", acquired = Empty, elapsed_ms = Empty, error = Empty))]
    pub async fn acquire_cancellable(
        &self,
        timeout: Option<Duration>,
        cancel: watch::Receiver<bool>,
    ) -> LockResult<RedisMutexHandle<S>> {
        if *cancel.borrow() {
            Span::current().record("error", "cancelled");
            return Err(LockError::Cancelled);
        }
        self.acquire_internal(timeout, Some(cancel)).await
    }

    fn handle(&self) -> RedisMutexHandle<S> {
        RedisMutexHandle::new(self.name.clone(), self.keys.queue.clone(), self.store.clone())
    }

    async fn ensure_once(&self) -> LockResult<()> {
        self.ensured
            .get_or_try_init(|| async { self.ensure().await.map(|_| ()) })
            .await?;
        Ok(())
    }

    async fn acquire_internal(
        &self,
        timeout: Option<Duration>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> LockResult<RedisMutexHandle<S>> {
        let start = std::time::Instant::now();
        self.ensure_once().await?;

        match self.wait_for_token(timeout, cancel).await {
            Ok(Some(_)) => {
                Span::current().record("acquired", true);
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                Span::current().record("elapsed_ms", elapsed_ms);
                Ok(self.handle())
            }
            Ok(None) => {
                Span::current().record("acquired", false);
                Span::current().record("error", "timeout");
                Err(LockError::Timeout(timeout.unwrap_or_default()))
            }
            Err(e) => {
                Span::current().record("acquired", false);
                Span::current().record("error", e.to_string());
                Err(e)
            }
        }
    }

    /// Pops the token, waiting up to `timeout`.
    ///
    /// The blocking pop runs in its own task. When the caller stops waiting
    /// (timeout backstop, cancellation, or the acquire future being dropped)
    /// the pop is aborted, and a token it still returns is pushed back.
    async fn wait_for_token(
        &self,
        timeout: Option<Duration>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> PopResult {
        let timeout_value = TimeoutValue::from(timeout);
        if timeout_value.is_zero() {
            return self.store.pop(&self.keys.queue).await;
        }

        let (sender, mut receiver) = oneshot::channel::<PopResult>();
        // Dropping `abort` along with this future also aborts the pop.
        let (abort, abort_receiver) = watch::channel(false);
        let store = self.store.clone();
        let queue = self.keys.queue.clone();
        tokio::spawn(async move {
            let popped = store.blocking_pop(&queue, timeout_value, abort_receiver).await;
            if let Err(Ok(Some(token))) = sender.send(popped) {
                return_orphaned_token(&store, &queue, &token).await;
            }
        });

        let backstop = async {
            match timeout_value.as_duration() {
                Some(limit) => tokio::time::sleep(limit.saturating_add(CLIENT_TIMEOUT_GRACE)).await,
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match cancel {
                // A dropped sender can never cancel.
                Some(mut cancel) => {
                    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending().await,
            }
        };

        let wait = tokio::select! {
            popped = &mut receiver => Wait::Finished(popped),
            _ = backstop => Wait::TimedOut,
            _ = cancelled => Wait::Cancelled,
        };

        match wait {
            Wait::Finished(Ok(popped)) => popped,
            Wait::Finished(Err(_)) => Err(LockError::Backend(Box::new(std::io::Error::other(
                "blocking pop task ended without a result",
            )))),
            Wait::TimedOut => {
                warn!(lock.key = %self.keys.queue, "store did not answer blocking pop within its timeout");
                abort.send_replace(true);
                self.abandon(receiver).await?;
                Ok(None)
            }
            Wait::Cancelled => {
                abort.send_replace(true);
                self.abandon(receiver).await?;
                Err(LockError::Cancelled)
            }
        }
    }

    /// Stops waiting on an in-flight pop, returning a token it already delivered.
    async fn abandon(&self, mut receiver: oneshot::Receiver<PopResult>) -> LockResult<()> {
        receiver.close();
        if let Ok(Ok(Some(token))) = receiver.try_recv() {
            self.store.push(&self.keys.queue, &token).await?;
            debug!(lock.key = %self.keys.queue, "returned token received after giving up");
        }
        Ok(())
    }
}

async fn return_orphaned_token<S: TokenStore>(store: &S, queue: &str, token: &str) {
    match store.push(queue, token).await {
        Ok(()) => debug!(lock.key = %queue, "returned token popped after the waiter left"),
        Err(e) => warn!(
            lock.key = %queue,
            error = %e,
            "failed to return token popped after the waiter left"
        ),
    }
}

impl<S: TokenStore> DistributedLock for RedisDistributedMutex<S> {
    type Handle = RedisMutexHandle<S>;

    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.keys.marker, backend = "redis", seeded = Empty))]
    async fn ensure(&self) -> LockResult<bool> {
        let previous = self.store.get_set(&self.keys.marker, MARKER_SENTINEL).await?;
        let seeded = previous.is_none();
        if seeded {
            self.store.push(&self.keys.queue, TOKEN).await?;
            debug!(lock.queue = %self.keys.queue, "seeded initial token");
        }
        Span::current().record("seeded", seeded);
        let _ = self.ensured.set(());
        Ok(seeded)
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.keys.queue, timeout = ?timeout, backend = "redis", acquired = Empty, elapsed_ms = Empty, error = Empty))]
    async fn acquire(&self, timeout: Option<Duration>) -> LockResult<Self::Handle> {
        self.acquire_internal(timeout, None).await
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.keys.queue, backend = "redis", acquired = Empty))]
    async fn try_acquire(&self) -> LockResult<Option<Self::Handle>> {
        self.ensure_once().await?;
        let token = self.store.pop(&self.keys.queue).await?;
        Span::current().record("acquired", token.is_some());
        Ok(token.map(|_| self.handle()))
    }
}
