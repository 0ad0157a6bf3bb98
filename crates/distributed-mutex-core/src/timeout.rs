//! Timeout value helpers.

use std::time::Duration;

/// Represents a timeout duration for lock operations.
///
/// - `Some(duration)` - Wait up to this duration
/// - `Some(Duration::ZERO)` - Make a single attempt without waiting
/// - `None` - Wait indefinitely
pub type Timeout = Option<Duration>;

/// Longest wait, in seconds, sent to a blocking list command (about 31
/// years). Longer timeouts are clamped to it, since servers reject timeouts
/// whose deadline overflows.
pub const MAX_BLOCKING_SECS: f64 = 1_000_000_000.0;

/// Internal helper for timeout calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutValue {
    millis: i64, // -1 for infinite
}

impl TimeoutValue {
    pub const INFINITE: Self = Self { millis: -1 };
    pub const ZERO: Self = Self { millis: 0 };

    pub fn is_infinite(&self) -> bool {
        self.millis < 0
    }

    pub fn is_zero(&self) -> bool {
        self.millis == 0
    }

    pub fn as_duration(&self) -> Option<Duration> {
        if self.is_infinite() {
            None
        } else {
            Some(Duration::from_millis(self.millis as u64))
        }
    }

    /// Seconds in the form blocking list commands expect, where `0` means
    /// "block forever".
    ///
    /// A zero timeout has no blocking representation; callers must not issue
    /// a blocking pop for it. Bounded timeouts are capped at
    /// [`MAX_BLOCKING_SECS`].
    pub fn as_blocking_secs(&self) -> f64 {
        match self.as_duration() {
            Some(d) => d.as_secs_f64().min(MAX_BLOCKING_SECS),
            None => 0.0,
        }
    }
}

impl From<Option<Duration>> for TimeoutValue {
    fn from(timeout: Option<Duration>) -> Self {
        match timeout {
            None => Self::INFINITE,
            Some(d) if d.is_zero() => Self::ZERO,
            // Sub-millisecond waits round up so they still block.
            Some(d) => Self {
                millis: i64::try_from(d.as_millis()).unwrap_or(i64::MAX).max(1),
            },
        }
    }
}
