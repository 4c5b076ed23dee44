//! Rate Limiter & Payload Guard (C4).
//!
//! Grounded on `haven-api/src/auth.rs::AuthRateLimiter` (sliding window keyed
//! by identity, `Mutex<HashMap<..>>`), adapted from IP-keyed to
//! `PeerHandle`-keyed and from a rolling timestamp vec to the fixed-window
//! counter `filedrop_types::RateState` specifies.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use filedrop_types::{Clock, PeerHandle, RateState};

#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<HashMap<PeerHandle, RateState>>>,
    window: Duration,
    max: u32,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(window: Duration, max: u32, clock: Arc<dyn Clock>) -> Self {
        Self { state: Arc::new(Mutex::new(HashMap::new())), window, max, clock }
    }

    /// Returns `true` if the event is allowed and counted, `false` if the
    /// peer's window is saturated.
    pub async fn check(&self, peer: PeerHandle) -> bool {
        let now = self.clock.now();
        let mut map = self.state.lock().await;
        match map.get_mut(&peer) {
            Some(state) => {
                if state.is_saturated(now, self.max) {
                    return false;
                }
                state.record(now, self.window);
                true
            }
            None => {
                map.insert(peer, RateState::fresh(now, self.window));
                true
            }
        }
    }

    pub async fn forget(&self, peer: PeerHandle) {
        self.state.lock().await.remove(&peer);
    }
}

/// Rejects any serialized [`SignalEnvelope`] exceeding `MAX_SIGNAL_PAYLOAD`.
///
/// [`SignalEnvelope`]: filedrop_types::SignalEnvelope
#[derive(Debug, Clone, Copy)]
pub struct PayloadGuard {
    max_bytes: usize,
}

impl PayloadGuard {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn check(&self, serialized_len: usize) -> bool {
        serialized_len <= self.max_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedrop_types::SystemClock;

    #[tokio::test]
    async fn allows_up_to_max_then_rejects() {
        let limiter = RateLimiter::new(Duration::from_secs(1), 3, Arc::new(SystemClock));
        let peer = PeerHandle::new();
        assert!(limiter.check(peer).await);
        assert!(limiter.check(peer).await);
        assert!(limiter.check(peer).await);
        assert!(!limiter.check(peer).await);
    }

    #[tokio::test]
    async fn forget_resets_state() {
        let limiter = RateLimiter::new(Duration::from_secs(1), 1, Arc::new(SystemClock));
        let peer = PeerHandle::new();
        assert!(limiter.check(peer).await);
        assert!(!limiter.check(peer).await);
        limiter.forget(peer).await;
        assert!(limiter.check(peer).await);
    }

    #[test]
    fn payload_guard_rejects_oversized() {
        let guard = PayloadGuard::new(100);
        assert!(guard.check(100));
        assert!(!guard.check(101));
    }
}
