//! Progress Throttle (C2): a pure function deciding whether to emit a
//! progress report, and how to format it.
//!
//! Grounded stylistically on `haven-fast-transfer/src/sender.rs`'s
//! `SenderProgress` bookkeeping, but implemented as a pure function per
//! §4.2 rather than shared atomics — the client side has no concurrent
//! writers to guard against.

use std::time::{Duration, Instant};

const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
pub struct ProgressState {
    start_time: Instant,
    last_report_at: Option<Instant>,
    last_reported_percent: Option<u32>,
}

impl ProgressState {
    pub fn new(start_time: Instant) -> Self {
        Self { start_time, last_report_at: None, last_reported_percent: None }
    }

    /// Evaluates `(transferred, total, now)` and, if the throttle allows it,
    /// returns a formatted report and advances internal state.
    ///
    /// Emission requires both an elapsed 500ms *and* a changed percent (§4.2):
    /// suppressed if either condition fails.
    pub fn report(&mut self, transferred: u64, total: u64, now: Instant) -> Option<String> {
        let percent = percent_of(transferred, total);

        if let Some(last_at) = self.last_report_at {
            let elapsed_since_last = now.saturating_duration_since(last_at);
            let percent_unchanged = self.last_reported_percent == Some(percent);
            if elapsed_since_last < MIN_REPORT_INTERVAL || percent_unchanged {
                return None;
            }
        }

        self.last_report_at = Some(now);
        self.last_reported_percent = Some(percent);

        let elapsed = now.saturating_duration_since(self.start_time).as_secs_f64();
        let speed_bps = if elapsed > 0.0 { transferred as f64 / elapsed } else { 0.0 };
        let remaining = total.saturating_sub(transferred) as f64;
        let eta_secs = if speed_bps > 0.0 { remaining / speed_bps } else { 0.0 };

        Some(format!(
            "{percent}% • {:.2} MB/s • ETA {}",
            speed_bps / (1024.0 * 1024.0),
            format_eta(eta_secs)
        ))
    }
}

fn percent_of(transferred: u64, total: u64) -> u32 {
    if total == 0 {
        return 100;
    }
    (100.0 * transferred as f64 / total as f64).round() as u32
}

fn format_eta(secs: f64) -> String {
    let secs = secs.round() as u64;
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", (secs as f64 / 60.0).round() as u64)
    } else {
        format!("{}h", (secs as f64 / 3600.0).round() as u64)
    }
}
