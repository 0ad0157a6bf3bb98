//! Redis backend for the queue-backed distributed mutex.

pub mod handle;
pub mod keys;
pub mod lock;
pub mod memory;
pub mod provider;
pub mod store;

pub use handle::RedisMutexHandle;
pub use keys::MutexKeys;
pub use lock::RedisDistributedMutex;
pub use memory::MemoryTokenStore;
pub use provider::{RedisMutexProvider, RedisMutexProviderBuilder};
pub use store::{RedisTokenStore, TokenStore};
