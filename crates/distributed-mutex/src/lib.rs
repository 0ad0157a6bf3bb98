//! Distributed mutex for Rust over a shared Redis list.
//!
//! Independent processes coordinate exclusive access to a named resource
//! through nothing but a shared Redis server. Each name owns a list that holds
//! a single token while the resource is free; acquiring pops it with BLPOP and
//! releasing pushes it back.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use distributed_mutex::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = RedisMutexProvider::new("redis://localhost:6379").await?;
//!
//!     // Create a lock by name; its token is seeded on first use
//!     let lock = provider.create_lock("my-resource")?;
//!
//!     // Acquire the lock with a timeout
//!     let handle = lock.acquire(Some(Duration::from_secs(5))).await?;
//!
//!     // Critical section - we have exclusive access
//!     println!("Doing critical work...");
//!
//!     handle.release().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Scoped acquisition
//!
//! ```rust,no_run
//! use distributed_mutex::*;
//! use std::time::Duration;
//!
//! # async fn run(provider: RedisMutexProvider) -> Result<(), LockError> {
//! let answer = provider
//!     .with_lock("my-resource", Some(Duration::from_secs(5)), || async {
//!         Ok::<_, LockError>(42)
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Semantics
//!
//! - **Timeouts**: `Some(d)` bounds the wait, `Some(Duration::ZERO)` tries
//!   once, `None` waits forever. Running out of time is
//!   `LockError::Timeout`, distinct from store failures.
//! - **Not reentrant**: a holder acquiring again waits on itself.
//! - **No expiry**: a crashed holder keeps the lock until its token is pushed
//!   back by hand.
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports types from:
//! - `distributed-mutex-core`: Core traits and types
//! - `distributed-mutex-redis`: Redis backend and in-memory store
//!
//! For fine-grained control, you can depend on individual crates instead.

// Re-export core types and traits
pub use distributed_mutex_core::*;

// Re-export redis backend
pub use distributed_mutex_redis::*;
