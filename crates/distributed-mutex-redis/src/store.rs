//! The store operations the mutex relies on, and the Redis implementation.

use std::future::Future;

use distributed_mutex_core::error::{LockError, LockResult};
use distributed_mutex_core::timeout::TimeoutValue;
use fred::prelude::*;
use tokio::sync::watch;
use tracing::debug;

/// Operations the mutex needs from the shared store.
///
/// Every method is a potentially failing network call. Implementations must
/// make `get_set` atomic and linearizable across all clients, and a single
/// `push` must satisfy at most one `blocking_pop`.
pub trait TokenStore: Clone + Send + Sync + 'static {
    /// Atomically sets `key` to `value`, returning the previous value.
    fn get_set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = LockResult<Option<String>>> + Send;

    /// Appends `token` to the list at `key`, waking one blocked popper.
    fn push(&self, key: &str, token: &str) -> impl Future<Output = LockResult<()>> + Send;

    /// Removes the head of the list at `key` without waiting.
    fn pop(&self, key: &str) -> impl Future<Output = LockResult<Option<String>>> + Send;

    /// Removes the head of the list at `key`, waiting up to `timeout`.
    ///
    /// Returns `Ok(None)` when the timeout elapses, or when `abort` turns
    /// `true` or its sender is dropped. An aborted wait must stop blocking on
    /// the store; a token it had already taken is still returned. Never
    /// called with a zero timeout.
    fn blocking_pop(
        &self,
        key: &str,
        timeout: TimeoutValue,
        abort: watch::Receiver<bool>,
    ) -> impl Future<Output = LockResult<Option<String>>> + Send;

    /// Returns the length of the list at `key`.
    fn list_len(&self, key: &str) -> impl Future<Output = LockResult<usize>> + Send;
}

/// [`TokenStore`] over a fred Redis client.
///
/// Non-blocking commands share the client's connection. Each blocking pop
/// runs on its own short-lived connection, since a BLPOP parks the connection
/// it is sent on and would otherwise hold up the RPUSH that ends it. An
/// aborted pop is ended server-side with `CLIENT UNBLOCK`, sent over the
/// shared connection.
#[derive(Clone)]
pub struct RedisTokenStore {
    client: RedisClient,
}

impl RedisTokenStore {
    /// Wraps an already connected client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    /// Runs BLPOP on `waiter` (whose server-side id is `id`) until it
    /// answers or `abort` fires.
    ///
    /// On abort the BLPOP is unblocked and still awaited, so a token the
    /// server handed out just before the unblock is not lost.
    async fn pop_until_aborted(
        &self,
        waiter: &RedisClient,
        id: i64,
        key: &str,
        timeout: TimeoutValue,
        abort: &mut watch::Receiver<bool>,
    ) -> LockResult<Option<(String, String)>> {
        let pop = waiter.blpop::<Option<(String, String)>, _>(key, timeout.as_blocking_secs());
        tokio::pin!(pop);

        tokio::select! {
            popped = &mut pop => return popped.map_err(store_error),
            _ = abort.wait_for(|aborted| *aborted) => {}
        }

        debug!(client_id = id, "unblocking abandoned BLPOP");
        // If the unblock fails the BLPOP runs on until its own timeout.
        self.client
            .client_unblock::<i64, _>(id, None)
            .await
            .map_err(store_error)?;
        pop.await.map_err(store_error)
    }

    /// Opens a connection dedicated to one blocking command.
    async fn waiter(&self) -> LockResult<RedisClient> {
        let waiter = self.client.clone_new();
        waiter.connect();
        waiter.wait_for_connect().await.map_err(store_error)?;
        Ok(waiter)
    }
}

impl TokenStore for RedisTokenStore {
    async fn get_set(&self, key: &str, value: &str) -> LockResult<Option<String>> {
        self.client
            .getset::<Option<String>, _, _>(key, value)
            .await
            .map_err(store_error)
    }

    async fn push(&self, key: &str, token: &str) -> LockResult<()> {
        let _: i64 = self
            .client
            .rpush(key, token)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn pop(&self, key: &str) -> LockResult<Option<String>> {
        self.client
            .lpop::<Option<String>, _>(key, None)
            .await
            .map_err(store_error)
    }

    async fn blocking_pop(
        &self,
        key: &str,
        timeout: TimeoutValue,
        mut abort: watch::Receiver<bool>,
    ) -> LockResult<Option<String>> {
        let waiter = self.waiter().await?;
        let popped = match waiter.client_id::<i64>().await {
            Ok(id) => self.pop_until_aborted(&waiter, id, key, timeout, &mut abort).await,
            Err(e) => Err(store_error(e)),
        };

        if let Err(e) = waiter.quit().await {
            debug!(error = %e, "failed to close blocking connection");
        }

        Ok(popped?.map(|(_, token)| token))
    }

    async fn list_len(&self, key: &str) -> LockResult<usize> {
        self.client
            .llen::<usize, _>(key)
            .await
            .map_err(store_error)
    }
}

/// Maps a Redis error onto the lock error taxonomy.
///
/// Transport failures become `Connection`; anything the server or the
/// protocol layer rejected becomes `Backend`.
pub(crate) fn store_error(e: RedisError) -> LockError {
    match e.kind() {
        RedisErrorKind::IO | RedisErrorKind::Timeout | RedisErrorKind::Canceled => {
            LockError::Connection(Box::new(e))
        }
        _ => LockError::Backend(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_map_to_connection() {
        let err = store_error(RedisError::new(RedisErrorKind::IO, "connection reset"));
        assert!(matches!(err, LockError::Connection(_)));

        let err = store_error(RedisError::new(RedisErrorKind::Timeout, "timed out"));
        assert!(matches!(err, LockError::Connection(_)));
    }

    #[test]
    fn test_server_errors_map_to_backend() {
        let err = store_error(RedisError::new(
            RedisErrorKind::InvalidCommand,
            "WRONGTYPE Operation against a key holding the wrong kind of value",
        ));
        assert!(matches!(err, LockError::Backend(_)));
        assert!(err.is_store_unavailable());
    }
}
