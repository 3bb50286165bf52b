//! Time source and sleep for the ingest loop.
//!
//! The loop never calls `SystemTime` or `thread::sleep` directly, so tests and
//! dry runs can drive it through hours of simulated time instantly.

use std::cell::Cell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall clock plus sleep, as seen by the ingest loop.
pub trait Clock {
    /// Current time in whole seconds since the Unix epoch.
    fn now(&self) -> i64;

    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Simulated clock: `sleep` advances time instead of blocking.
///
/// Time is tracked in milliseconds so that sub-second poll intervals still
/// add up to whole seconds.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<i64>,
    sleeps: Cell<u64>,
}

impl ManualClock {
    /// Start the clock at `secs` seconds since the epoch.
    pub fn starting_at(secs: i64) -> Self {
        Self {
            now_ms: Cell::new(secs.saturating_mul(1000)),
            sleeps: Cell::new(0),
        }
    }

    /// Move time forward without counting a sleep.
    pub fn advance(&self, duration: Duration) {
        let ms = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        self.now_ms.set(self.now_ms.get().saturating_add(ms));
    }

    /// Jump to `secs` seconds since the epoch.
    pub fn set(&self, secs: i64) {
        self.now_ms.set(secs.saturating_mul(1000));
    }

    /// Number of times `sleep` has been called.
    pub fn sleeps(&self) -> u64 {
        self.sleeps.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now_ms.get().div_euclid(1000)
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> i64 {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}
