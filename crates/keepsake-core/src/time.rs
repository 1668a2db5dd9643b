//! Time source abstraction.
//!
//! The authentication gate reads wall-clock time for lockout and session
//! bookkeeping and suspends the calling thread for the progressive
//! anti-guessing delay. Both go through the `Clock` trait so hosts can
//! inject a deterministic source in tests instead of waiting out real
//! 30-minute lockouts.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of current time and of delay suspension.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the calling thread. Only the caller is delayed; unrelated
    /// work on other threads proceeds.
    fn sleep(&self, duration: Duration);
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock for tests and simulations.
///
/// `sleep` advances the clock's own time instead of blocking, so a suite
/// can exercise progressive delays, lockout expiry, and both session
/// timeouts without real waiting.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now = *now + chrono::Duration::from_std(duration).expect("duration out of range");
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().expect("clock mutex poisoned").clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }

    fn sleep(&self, duration: Duration) {
        self.slept
            .lock()
            .expect("clock mutex poisoned")
            .push(duration);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(Utc::now());
        let before = clock.now();
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now() - before, chrono::Duration::seconds(90));
    }

    #[test]
    fn test_manual_clock_sleep_advances_and_records() {
        let clock = ManualClock::new(Utc::now());
        let before = clock.now();
        clock.sleep(Duration::from_secs(5));
        assert_eq!(clock.now() - before, chrono::Duration::seconds(5));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }
}
