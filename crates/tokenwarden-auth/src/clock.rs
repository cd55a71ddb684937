//! Time source used by validation, blacklisting, and claim defaults.
//!
//! Every component reads "now" through a [`Clock`] so tests can freeze time
//! with [`FixedClock`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use time::OffsetDateTime;

/// A source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> OffsetDateTime;

    /// Returns the current instant as unix seconds.
    fn timestamp(&self) -> i64 {
        self.now().unix_timestamp()
    }
}

/// Shareable clock handle.
pub type DynClock = Arc<dyn Clock>;

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Returns the default wall-clock handle.
#[must_use]
pub fn system_clock() -> DynClock {
    Arc::new(SystemClock)
}

/// A clock frozen at a unix timestamp that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedClock {
    seconds: AtomicI64,
}

impl FixedClock {
    /// Creates a clock frozen at `timestamp` (unix seconds).
    #[must_use]
    pub fn at(timestamp: i64) -> Self {
        Self {
            seconds: AtomicI64::new(timestamp),
        }
    }

    /// Creates a clock frozen at the current wall-clock second.
    #[must_use]
    pub fn frozen_now() -> Self {
        Self::at(OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Moves the clock to `timestamp`.
    pub fn set(&self, timestamp: i64) {
        self.seconds.store(timestamp, Ordering::SeqCst);
    }

    /// Moves the clock forward (or backward, for negative values) by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        let seconds = self.seconds.load(Ordering::SeqCst);
        OffsetDateTime::from_unix_timestamp(seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    fn timestamp(&self) -> i64 {
        self.seconds.load(Ordering::SeqCst)
    }
}
