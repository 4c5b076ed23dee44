//! A thin abstraction over `Instant::now()` so the rate limiter, room TTL
//! sweep, and peer-connection timers (disconnect/restart) can be driven by a
//! fake clock in tests instead of real wall time.

use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The production clock: a thin wrapper over `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A shared, cloneable clock handle, typically `Arc<SystemClock>` in
/// production and `Arc<FakeClock>` in tests.
pub type SharedClock = Arc<dyn Clock>;

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// A manually-advanced clock for deterministic tests.
#[derive(Debug)]
pub struct FakeClock {
    inner: std::sync::Mutex<Instant>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { inner: std::sync::Mutex::new(Instant::now()) }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.inner.lock().unwrap();
        *guard += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.inner.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_on_demand() {
        let clock = FakeClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_secs(5));
        assert!(clock.now() >= t0 + Duration::from_secs(5));
    }
}
