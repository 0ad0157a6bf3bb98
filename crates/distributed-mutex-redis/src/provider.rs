//! Redis mutex provider implementation.

use std::time::Duration;

use distributed_mutex_core::error::{LockError, LockResult};
use distributed_mutex_core::traits::LockProvider;
use fred::prelude::*;

use crate::lock::RedisDistributedMutex;
use crate::store::{RedisTokenStore, TokenStore, store_error};

/// Default acquisition timeout for locks created by a provider.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// URL used by [`RedisMutexProviderBuilder::from_env`] when `REDIS_URL` is unset.
pub const DEFAULT_URL: &str = "redis://localhost:6379";

/// Builder for Redis mutex provider configuration.
pub struct RedisMutexProviderBuilder {
    url: Option<String>,
    client: Option<RedisClient>,
    database: Option<u8>,
    default_timeout: Option<Duration>,
}

impl RedisMutexProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: None,
            client: None,
            database: None,
            default_timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Reads the configuration from the environment.
    ///
    /// * `REDIS_URL` - server URL, defaulting to `redis://localhost:6379`
    /// * `REDIS_DB` - database index overriding the one in the URL
    pub fn from_env() -> LockResult<Self> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let mut builder = Self::new().url(url);

        if let Ok(db) = std::env::var("REDIS_DB") {
            let database = db.parse::<u8>().map_err(|e| {
                LockError::Connection(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid REDIS_DB '{db}': {e}"),
                )))
            })?;
            builder = builder.database(database);
        }

        Ok(builder)
    }

    /// Sets the Redis server URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses an existing, connected Redis client instead of a URL.
    pub fn client(mut self, client: RedisClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Selects the database index. Only applies when connecting from a URL.
    pub fn database(mut self, database: u8) -> Self {
        self.database = Some(database);
        self
    }

    /// Sets the timeout used by `acquire_default`. `None` waits indefinitely.
    ///
    /// Default: 60 seconds
    pub fn default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Builds the provider, connecting to Redis if a URL was given.
    pub async fn build(self) -> LockResult<RedisMutexProvider> {
        let client = match (self.client, self.url) {
            (Some(client), _) => client,
            (None, Some(url)) => {
                let mut config = RedisConfig::from_url(&url).map_err(|e| {
                    LockError::Connection(Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("invalid Redis URL: {}", e),
                    )))
                })?;
                if let Some(database) = self.database {
                    config.database = Some(database);
                }

                let client = RedisClient::new(config, None, None, None);
                client.connect();
                client.wait_for_connect().await.map_err(store_error)?;
                client
            }
            (None, None) => {
                return Err(LockError::InvalidName(
                    "no Redis client or URL provided".to_string(),
                ));
            }
        };

        Ok(RedisMutexProvider::with_store(
            RedisTokenStore::new(client),
            self.default_timeout,
        ))
    }
}

impl Default for RedisMutexProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider for Redis-backed distributed mutexes.
///
/// Every lock it creates shares the provider's store client.
pub struct RedisMutexProvider<S: TokenStore = RedisTokenStore> {
    store: S,
    default_timeout: Option<Duration>,
}

impl RedisMutexProvider {
    /// Returns a new builder for configuring the provider.
    pub fn builder() -> RedisMutexProviderBuilder {
        RedisMutexProviderBuilder::new()
    }

    /// Creates a provider using the specified Redis URL.
    pub async fn new(url: impl Into<String>) -> LockResult<Self> {
        Self::builder().url(url).build().await
    }
}

impl<S: TokenStore> RedisMutexProvider<S> {
    /// Creates a provider over any [`TokenStore`].
    pub fn with_store(store: S, default_timeout: Option<Duration>) -> Self {
        Self {
            store,
            default_timeout,
        }
    }

    /// Returns the store shared by this provider's locks.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the default timeout handed to created locks.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }
}

impl<S: TokenStore> LockProvider for RedisMutexProvider<S> {
    type Lock = RedisDistributedMutex<S>;

    fn create_lock(&self, name: &str) -> LockResult<Self::Lock> {
        RedisDistributedMutex::new(name, self.store.clone(), self.default_timeout)
    }
}
