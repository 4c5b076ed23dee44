//! Receive Pipeline (C9).
//!
//! Grounded on `haven-fast-transfer/src/receiver.rs`'s assembler/writer split
//! and `haven-file-server/src/storage.rs`'s streaming `tokio::fs` write
//! pattern, swapped from the teacher's per-chunk SHA-256 to the spec's
//! per-frame CRC32.

use std::collections::BTreeMap;
use std::time::Instant;

use filedrop_types::{ChunkFrame, FileMetadata};

use crate::crc::{crc32, crc32_to_hex};
use crate::error::TransferError;
use crate::logging::{TransferEvent, TransferLogger};
use crate::ports::{Presenter, WritableSink};
use crate::progress::ProgressState;

pub struct ReceiveConfig {
    pub max_in_memory: u64,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self { max_in_memory: 200 << 20 }
    }
}

enum Sink {
    InMemory(BTreeMap<u32, Vec<u8>>),
    Streaming(Box<dyn WritableSink>),
}

pub struct ReceiveState {
    meta: FileMetadata,
    received_bytes: u64,
    received_chunks: u32,
    sink: Sink,
    last_validation_error: Option<(String, String)>,
    progress: ProgressState,
    start_time: Instant,
}

pub enum InitOutcome {
    InMemory(ReceiveState),
    /// `size > MAX_IN_MEMORY` and no streaming sink was available — the
    /// caller should surface `warning` as a non-fatal advisory before the
    /// transfer proceeds in memory anyway.
    InMemoryWithWarning(ReceiveState, &'static str),
    Streaming(ReceiveState),
}

/// Parses the first text frame as [`FileMetadata`] and decides in-memory vs
/// streaming per §4.9.1. `acquire_sink` is called only when `size` exceeds
/// `config.max_in_memory`; returning `None` models "unavailable capability".
pub fn init(
    text: &str,
    config: &ReceiveConfig,
    now: Instant,
    acquire_sink: impl FnOnce() -> Option<Box<dyn WritableSink>>,
) -> Result<InitOutcome, TransferError> {
    let meta: FileMetadata =
        serde_json::from_str(text).map_err(|e| TransferError::Validation(format!("bad metadata: {e}")))?;
    if meta.kind != filedrop_types::MetadataKind::Metadata {
        return Err(TransferError::Validation("not a metadata frame".into()));
    }

    let base = |sink| ReceiveState {
        meta: meta.clone(),
        received_bytes: 0,
        received_chunks: 0,
        sink,
        last_validation_error: None,
        progress: ProgressState::new(now),
        start_time: now,
    };

    if meta.size > config.max_in_memory {
        if let Some(sink) = acquire_sink() {
            return Ok(InitOutcome::Streaming(base(Sink::Streaming(sink))));
        }
        return Ok(InitOutcome::InMemoryWithWarning(
            base(Sink::InMemory(BTreeMap::new())),
            "may consume significant memory",
        ));
    }

    Ok(InitOutcome::InMemory(base(Sink::InMemory(BTreeMap::new()))))
}

pub enum IngestOutcome {
    Progress(Option<String>),
    Complete,
}

impl ReceiveState {
    pub fn last_validation_error(&self) -> Option<&(String, String)> {
        self.last_validation_error.as_ref()
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    /// Ingests one binary frame (§4.9.2). A CRC mismatch drops the frame and
    /// does not advance counters, but is not itself a terminal error — the
    /// channel stays open per §4.9.2's note on this being an ordered,
    /// reliable transport.
    pub async fn ingest(
        &mut self,
        frame: &[u8],
        logger: &dyn TransferLogger,
        presenter: &dyn Presenter,
        now: Instant,
    ) -> Result<IngestOutcome, TransferError> {
        let ChunkFrame { crc32: received_crc, payload } = match ChunkFrame::decode(frame) {
            Ok(frame) => frame,
            Err(err) => {
                let err = TransferError::Validation(err.to_string());
                presenter.error(&err);
                return Err(err);
            }
        };

        let computed_crc = crc32(&payload);
        if received_crc != computed_crc {
            let expected = crc32_to_hex(received_crc);
            let got = crc32_to_hex(computed_crc);
            logger.log(
                &self.meta.file_id,
                TransferEvent::IntegrityMismatch { expected_crc: expected.clone(), got_crc: got.clone() },
            );
            self.last_validation_error = Some((expected, got));
            return Ok(IngestOutcome::Progress(None));
        }

        match &mut self.sink {
            Sink::Streaming(sink) => {
                if let Err(err) = sink.write(&payload).await {
                    presenter.error(&err);
                    return Err(err);
                }
            }
            Sink::InMemory(chunks) => {
                chunks.insert(self.received_chunks, payload.clone());
            }
        }

        self.received_chunks += 1;
        self.received_bytes += payload.len() as u64;

        let report = self.progress.report(self.received_bytes, self.meta.size, now);
        if let Some(report) = &report {
            presenter.progress(report);
        }

        // §4.9.2: `received_bytes == meta.size` is the canonical completion
        // signal; `total_chunks` is only a lower bound once chunk sizes drift.
        if self.received_bytes >= self.meta.size {
            return Ok(IngestOutcome::Complete);
        }
        if self.received_chunks >= self.meta.total_chunks && self.received_bytes < self.meta.size {
            tracing::debug!(
                file_id = %self.meta.file_id,
                "total_chunks reached before received_bytes == size; continuing by byte count"
            );
        }

        Ok(IngestOutcome::Progress(report))
    }
}

pub struct CompletedArtifact {
    pub name: String,
    pub mime: String,
    pub last_modified: i64,
    pub bytes: Option<Vec<u8>>,
}

/// Finalizes a transfer (§4.9.3). For the streaming path the sink is closed
/// and `bytes` is `None` (the artifact already lives on disk); for the
/// in-memory path the chunks are concatenated by ascending key and handed to
/// the presenter as a ready download.
pub async fn complete(
    mut state: ReceiveState,
    logger: &dyn TransferLogger,
    presenter: &dyn Presenter,
    now: Instant,
) -> Result<CompletedArtifact, TransferError> {
    let duration_ms = now.saturating_duration_since(state.start_time).as_millis() as u64;
    logger.log(&state.meta.file_id, TransferEvent::Complete { total_bytes: state.received_bytes, duration_ms });

    match &mut state.sink {
        Sink::Streaming(sink) => {
            if let Err(err) = sink.close().await {
                presenter.error(&err);
                return Err(err);
            }
            Ok(CompletedArtifact {
                name: state.meta.name.clone(),
                mime: state.meta.file_type.clone(),
                last_modified: state.meta.last_modified,
                bytes: None,
            })
        }
        Sink::InMemory(chunks) => {
            let mut out = Vec::with_capacity(state.received_bytes as usize);
            for (_, chunk) in std::mem::take(chunks) {
                out.extend_from_slice(&chunk);
            }
            presenter.download_ready(&state.meta.name, &state.meta.file_type, out.clone());
            Ok(CompletedArtifact {
                name: state.meta.name.clone(),
                mime: state.meta.file_type.clone(),
                last_modified: state.meta.last_modified,
                bytes: Some(out),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NullLogger;
    use crate::ports::NullPresenter;

    fn metadata_text(size: u64, chunk_size: u32) -> String {
        let meta = FileMetadata::new("abc123".into(), "hello.txt".into(), size, String::new(), 0, chunk_size);
        serde_json::to_string(&meta).unwrap()
    }

    #[tokio::test]
    async fn full_receive_reassembles_bytes_in_order() {
        let now = Instant::now();
        let text = metadata_text(13, 16);
        let outcome = init(&text, &ReceiveConfig::default(), now, || None).unwrap();
        let InitOutcome::InMemory(mut state) = outcome else { panic!("expected in-memory") };

        let payload = b"hello, world\n";
        let frame = ChunkFrame::encode(crc32(payload), payload);
        let logger = NullLogger;
        let presenter = NullPresenter;
        let result = state.ingest(&frame, &logger, &presenter, now).await.unwrap();
        assert!(matches!(result, IngestOutcome::Complete));

        let artifact = complete(state, &logger, &presenter, now).await.unwrap();
        assert_eq!(artifact.bytes.unwrap(), payload);
    }

    #[tokio::test]
    async fn crc_mismatch_drops_frame_without_advancing() {
        let now = Instant::now();
        let text = metadata_text(13, 16);
        let outcome = init(&text, &ReceiveConfig::default(), now, || None).unwrap();
        let InitOutcome::InMemory(mut state) = outcome else { panic!("expected in-memory") };

        let mut frame = ChunkFrame::encode(crc32(b"hello, world\n"), b"hello, world\n");
        frame[0] ^= 0xff;
        let logger = NullLogger;
        let presenter = NullPresenter;
        let result = state.ingest(&frame, &logger, &presenter, now).await.unwrap();
        assert!(matches!(result, IngestOutcome::Progress(_)));
        assert_eq!(state.received_bytes(), 0);
        assert!(state.last_validation_error().is_some());
    }

    #[tokio::test]
    async fn oversized_transfer_without_sink_falls_back_with_warning() {
        let now = Instant::now();
        let text = metadata_text(300 << 20, 131_072);
        let config = ReceiveConfig::default();
        let outcome = init(&text, &config, now, || None).unwrap();
        assert!(matches!(outcome, InitOutcome::InMemoryWithWarning(_, "may consume significant memory")));
    }
}
