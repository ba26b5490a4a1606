//! Time source used for cache lifetime bookkeeping.
//!
//! All expiry arithmetic goes through [`Clock`] so tests can drive time
//! explicitly instead of sleeping across lifetime boundaries.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of "now" in seconds since the Unix epoch.
///
/// Entries persist across process restarts, so this is wall-clock time,
/// not a process-local instant. Sub-second precision is kept because
/// short-lived namespaces measure lifetimes in the hundreds of seconds.
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// System wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            // Clock before 1970: treat as epoch rather than panic.
            Err(_) => 0.0,
        }
    }
}

/// Manually advanced clock for tests.
///
/// Starts at an arbitrary positive offset so that a zero timestamp never
/// masquerades as a valid creation time.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Create a clock pinned at `start` epoch seconds.
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: f64) {
        *self.now.lock().unwrap() += secs;
    }

    /// Pin the clock to an absolute time.
    pub fn set(&self, epoch_secs: f64) {
        *self.now.lock().unwrap() = epoch_secs;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(1_000_000.0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_recent() {
        // Anything after 2020 counts as sane.
        assert!(SystemClock.now() > 1_577_836_800.0);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(100.0);
        assert_eq!(clock.now(), 100.0);
        clock.advance(675.5);
        assert_eq!(clock.now(), 775.5);
        clock.set(42.0);
        assert_eq!(clock.now(), 42.0);
    }
}
