//! Convenience prelude for distributed mutex types.

pub use crate::error::{LockError, LockResult};
pub use crate::timeout::Timeout;
pub use crate::traits::{
    DistributedLock, DistributedLockExt, LockHandle, LockProvider, LockProviderExt,
};
