//! Key naming for mutex state in the store.
//!
//! These prefixes are shared with every existing deployment of the lock, so
//! they must never change.

use distributed_mutex_core::error::{LockError, LockResult};

/// Prefix of the existence-marker key.
pub const MARKER_PREFIX: &str = "lock:name:";

/// Prefix of the token-queue key.
pub const QUEUE_PREFIX: &str = "lock:mutex:";

/// Value written to the existence marker.
pub const MARKER_SENTINEL: &str = "1";

/// The token pushed onto the queue to mean "free".
pub const TOKEN: &str = "1";

/// The pair of store keys backing one named mutex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexKeys {
    /// Existence-marker key, set once with GETSET.
    pub marker: String,
    /// Token-queue key, a list holding zero or one tokens.
    pub queue: String,
}

impl MutexKeys {
    /// Derives both keys from a lock name.
    pub fn new(name: &str) -> LockResult<Self> {
        if name.is_empty() {
            return Err(LockError::InvalidName("lock name cannot be empty".to_string()));
        }

        Ok(Self {
            marker: format!("{MARKER_PREFIX}{name}"),
            queue: format!("{QUEUE_PREFIX}{name}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match_deployed_layout() {
        let keys = MutexKeys::new("resource-A").unwrap();
        assert_eq!(keys.marker, "lock:name:resource-A");
        assert_eq!(keys.queue, "lock:mutex:resource-A");
    }

    #[test]
    fn test_roles_never_collide() {
        let keys = MutexKeys::new("x").unwrap();
        assert_ne!(keys.marker, keys.queue);

        // A name that looks like the other prefix still maps apart.
        let tricky = MutexKeys::new("mutex:x").unwrap();
        assert_ne!(tricky.marker, keys.queue);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(MutexKeys::new(""), Err(LockError::InvalidName(_))));
    }

    #[test]
    fn test_names_are_not_normalized() {
        let lower = MutexKeys::new("job").unwrap();
        let upper = MutexKeys::new("JOB").unwrap();
        assert_ne!(lower, upper);
        assert_eq!(MutexKeys::new("a b/c").unwrap().queue, "lock:mutex:a b/c");
    }
}
