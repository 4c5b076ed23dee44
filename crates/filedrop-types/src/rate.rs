//! Per-peer sliding-window rate state (§3 `RateState`), the data half of
//! the fixed-window-with-refill-at-boundary algorithm C4 implements.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct RateState {
    pub count: u32,
    pub window_end: Instant,
}

impl RateState {
    /// Starts a fresh window of length `window` beginning at `now`, with one
    /// event already counted.
    pub fn fresh(now: Instant, window: Duration) -> Self {
        Self { count: 1, window_end: now + window }
    }

    /// Applies one event at `now`. Returns `true` if the window rolled over
    /// and was reset, `false` if it was a same-window increment.
    pub fn record(&mut self, now: Instant, window: Duration) -> bool {
        if now > self.window_end {
            *self = Self::fresh(now, window);
            true
        } else {
            self.count += 1;
            false
        }
    }

    pub fn is_saturated(&self, now: Instant, max: u32) -> bool {
        now <= self.window_end && self.count >= max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_resets_after_expiry() {
        let window = Duration::from_secs(1);
        let t0 = Instant::now();
        let mut state = RateState::fresh(t0, window);
        assert_eq!(state.count, 1);
        let rolled = state.record(t0 + Duration::from_millis(500), window);
        assert!(!rolled);
        assert_eq!(state.count, 2);
        let rolled = state.record(t0 + Duration::from_secs(2), window);
        assert!(rolled);
        assert_eq!(state.count, 1);
    }

    #[test]
    fn saturation_respects_window_boundary() {
        let window = Duration::from_secs(1);
        let t0 = Instant::now();
        let mut state = RateState::fresh(t0, window);
        for _ in 0..8 {
            state.record(t0, window);
        }
        assert_eq!(state.count, 9);
        assert!(!state.is_saturated(t0, 10));
        state.record(t0, window);
        assert!(state.is_saturated(t0, 10));
    }
}
