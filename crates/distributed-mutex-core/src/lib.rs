//! Core traits and types for the queue-backed distributed mutex.

pub mod error;
pub mod prelude;
pub mod timeout;
pub mod traits;

pub use error::{LockError, LockResult};
pub use prelude::*;
