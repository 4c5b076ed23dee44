//! Structured diagnostics for the transfer pipeline.
//!
//! Grounded on `haven-fast-transfer/src/logging.rs`'s `TransferLogger` trait
//! (`TracingLogger`/`NullLogger` pair over a `TransferEvent` enum), carried
//! over almost verbatim and re-pointed at the events this pipeline actually
//! produces.

use std::fmt;

#[derive(Debug, Clone)]
pub enum TransferEvent {
    Paused { buffered_amount: u64 },
    Resumed,
    RateAdjusted { batch_size: u32, yield_interval_ms: u32 },
    IntegrityMismatch { expected_crc: String, got_crc: String },
    Complete { total_bytes: u64, duration_ms: u64 },
    Error { message: String },
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paused { buffered_amount } => write!(f, "paused buffered_amount={buffered_amount}"),
            Self::Resumed => write!(f, "resumed"),
            Self::RateAdjusted { batch_size, yield_interval_ms } => {
                write!(f, "rate_adjusted batch_size={batch_size} yield_interval_ms={yield_interval_ms}")
            }
            Self::IntegrityMismatch { expected_crc, got_crc } => {
                write!(f, "integrity_mismatch expected={expected_crc} got={got_crc}")
            }
            Self::Complete { total_bytes, duration_ms } => {
                write!(f, "complete bytes={total_bytes} duration_ms={duration_ms}")
            }
            Self::Error { message } => write!(f, "error: {message}"),
        }
    }
}

pub trait TransferLogger: Send + Sync {
    fn log(&self, file_id: &str, event: TransferEvent);
}

pub struct TracingLogger;

impl TransferLogger for TracingLogger {
    fn log(&self, file_id: &str, event: TransferEvent) {
        match &event {
            TransferEvent::Error { .. } => tracing::error!(file_id, "{}", event),
            TransferEvent::IntegrityMismatch { .. } => tracing::warn!(file_id, "{}", event),
            TransferEvent::Complete { .. } => tracing::info!(file_id, "{}", event),
            _ => tracing::debug!(file_id, "{}", event),
        }
    }
}

pub struct NullLogger;

impl TransferLogger for NullLogger {
    fn log(&self, _file_id: &str, _event: TransferEvent) {}
}
