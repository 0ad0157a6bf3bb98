//! Core traits for distributed mutexes.

use std::future::Future;
use std::time::Duration;

use crate::error::{LockError, LockResult};

// ============================================================================
// Lock Handle Trait
// ============================================================================

/// Handle to a held distributed mutex.
///
/// A handle is the only way to release, and `release` consumes it, so a
/// single acquisition can give back at most one token. Dropping an unreleased
/// handle also returns the token, but only the async `release` reports errors.
///
/// # Example
///
/// ```rust,ignore
/// let handle = lock.acquire(Some(Duration::from_secs(5))).await?;
/// // Critical section - we hold the lock
/// do_work().await;
/// handle.release().await?;
/// ```
pub trait LockHandle: Send + Sync + Sized {
    /// Explicitly releases the lock, waking at most one blocked acquirer.
    fn release(self) -> impl Future<Output = LockResult<()>> + Send;
}

// ============================================================================
// Distributed Lock Trait
// ============================================================================

/// A distributed mutual exclusion lock.
///
/// Provides exclusive access to a resource identified by `name` across
/// processes and machines that share nothing but the backing store.
///
/// # Example
///
/// ```rust,ignore
/// use distributed_mutex_core::DistributedLock;
///
/// async fn protected_operation(lock: &impl DistributedLock) -> Result<(), Error> {
///     let handle = lock.acquire(Some(Duration::from_secs(5))).await?;
///     perform_critical_section().await?;
///     handle.release().await?;
///     Ok(())
/// }
/// ```
pub trait DistributedLock: Send + Sync {
    /// The handle type returned when the lock is acquired.
    type Handle: LockHandle + Send;

    /// Returns the unique name identifying this lock.
    fn name(&self) -> &str;

    /// Creates the lock's backing state in the store if nobody has yet.
    ///
    /// Safe to call any number of times from any number of processes; only
    /// the first caller for a name ever seeds the lock. Returns `true` if this
    /// call was that first caller.
    fn ensure(&self) -> impl Future<Output = LockResult<bool>> + Send;

    /// Acquires the lock, waiting up to `timeout`.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum time to wait. `None` means wait indefinitely and
    ///   `Some(Duration::ZERO)` means a single attempt without waiting.
    ///
    /// # Returns
    ///
    /// * `Ok(handle)` - Lock acquired successfully
    /// * `Err(LockError::Timeout)` - Timeout expired before lock acquired
    /// * `Err(LockError::Connection)` / `Err(LockError::Backend)` - Store failed
    ///
    /// A timeout is terminal for this call; nothing is retried internally.
    fn acquire(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = LockResult<Self::Handle>> + Send;

    /// Attempts to acquire the lock without waiting.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(handle))` - Lock acquired successfully
    /// * `Ok(None)` - Lock is held by another process
    /// * `Err(...)` - Error occurred during attempt
    fn try_acquire(&self) -> impl Future<Output = LockResult<Option<Self::Handle>>> + Send;
}

// ============================================================================
// Scoped Acquisition
// ============================================================================

/// Scoped acquisition on top of any [`DistributedLock`].
pub trait DistributedLockExt: DistributedLock {
    /// Runs `action` while holding the lock.
    ///
    /// The lock is released on every exit path of `action`, including errors
    /// (and panics, through the handle's drop). If acquisition itself fails,
    /// `action` never runs and nothing is released.
    ///
    /// When both `action` and the release fail, the action's error is
    /// returned and the release error is logged.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let total = lock
    ///     .with_lock(Some(Duration::from_secs(2)), || async {
    ///         let n = read_counter().await?;
    ///         write_counter(n + 1).await?;
    ///         Ok::<_, AppError>(n + 1)
    ///     })
    ///     .await?;
    /// ```
    fn with_lock<F, Fut, T, E>(
        &self,
        timeout: Option<Duration>,
        action: F,
    ) -> impl Future<Output = Result<T, E>> + Send
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<LockError> + Send,
    {
        async move {
            let handle = self.acquire(timeout).await?;
            let outcome = action().await;
            let released = handle.release().await;

            match (outcome, released) {
                (Ok(value), Ok(())) => Ok(value),
                (Ok(_), Err(release_error)) => Err(release_error.into()),
                (Err(action_error), Ok(())) => Err(action_error),
                (Err(action_error), Err(release_error)) => {
                    tracing::warn!(
                        lock.name = %self.name(),
                        error = %release_error,
                        "failed to release lock after protected action failed"
                    );
                    Err(action_error)
                }
            }
        }
    }
}

// Blanket implementation for all DistributedLocks
impl<L: DistributedLock> DistributedLockExt for L {}

// ============================================================================
// Provider Traits
// ============================================================================

/// Factory for creating distributed locks by name.
///
/// Providers encapsulate store configuration, allowing application code
/// to stay backend-agnostic.
///
/// # Example
///
/// ```rust,ignore
/// // Configure once at startup
/// let provider = RedisMutexProvider::new("redis://localhost:6379").await?;
///
/// // Create locks by name anywhere in the application
/// let lock = provider.create_lock("my-resource")?;
/// let handle = lock.acquire(None).await?;
/// ```
pub trait LockProvider: Send + Sync {
    /// The lock type created by this provider.
    type Lock: DistributedLock;

    /// Creates a lock with the given name.
    ///
    /// No store traffic happens here; the lock ensures itself before its
    /// first acquisition. Fails with `LockError::InvalidName` for an empty name.
    fn create_lock(&self, name: &str) -> LockResult<Self::Lock>;
}

// ============================================================================
// Convenience Extensions
// ============================================================================

/// Extension trait providing convenience methods for lock providers.
pub trait LockProviderExt: LockProvider {
    /// Creates a lock and eagerly ensures its backing state exists.
    fn open_lock(&self, name: &str) -> impl Future<Output = LockResult<Self::Lock>> + Send {
        async move {
            let lock = self.create_lock(name)?;
            lock.ensure().await?;
            Ok(lock)
        }
    }

    /// Acquires a lock by name, returning the handle.
    ///
    /// Convenience method combining `create_lock` and `acquire`.
    fn acquire_lock(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> impl Future<Output = LockResult<<Self::Lock as DistributedLock>::Handle>> + Send {
        async move {
            let lock = self.create_lock(name)?;
            lock.acquire(timeout).await
        }
    }

    /// Tries to acquire a lock by name.
    ///
    /// Convenience method combining `create_lock` and `try_acquire`.
    fn try_acquire_lock(
        &self,
        name: &str,
    ) -> impl Future<Output = LockResult<Option<<Self::Lock as DistributedLock>::Handle>>> + Send
    {
        async move {
            let lock = self.create_lock(name)?;
            lock.try_acquire().await
        }
    }

    /// Runs `action` while holding the lock named `name`.
    ///
    /// See [`DistributedLockExt::with_lock`] for the release guarantees.
    fn with_lock<F, Fut, T, E>(
        &self,
        name: &str,
        timeout: Option<Duration>,
        action: F,
    ) -> impl Future<Output = Result<T, E>> + Send
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<LockError> + Send,
    {
        async move {
            let lock = self.create_lock(name)?;
            DistributedLockExt::with_lock(&lock, timeout, action).await
        }
    }
}

// Blanket implementation for all LockProviders
impl<T: LockProvider> LockProviderExt for T {}
