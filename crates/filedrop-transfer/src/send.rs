//! Send Pipeline (C8).
//!
//! Grounded on `haven-fast-transfer/src/sender.rs`'s pipelined read/encode/send
//! loop and its `RATE_INCREASE`/`RATE_DECREASE` adaptation block, adapted to
//! the `batch_size`/`yield_interval` knobs §4.8.3 specifies. Resumption after
//! backpressure is modeled by simply `.await`-ing [`DataChannel::low_water`]
//! rather than polling, which is the event-driven contract §4.8.4 requires.

use std::time::Instant;

use filedrop_types::FileMetadata;

use crate::crc::crc32;
use crate::error::TransferError;
use crate::logging::{TransferEvent, TransferLogger};
use crate::ports::{DataChannel, FileBlob, Presenter};
use crate::progress::ProgressState;

/// §4.8.3.
pub const HIGH_WATER: u64 = 1 << 20;
const MIN_TARGET_BUFFER: u64 = 131_072;
const MAX_BATCH_SIZE: u32 = 20;
const MIN_YIELD_MS: u64 = 10;
const MAX_YIELD_MS: u64 = 200;

fn target_buffer(high_water: u64) -> u64 {
    std::cmp::max(MIN_TARGET_BUFFER, high_water / 2)
}

pub struct SendConfig {
    pub default_chunk_size: u32,
    pub high_water: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self { default_chunk_size: 131_072, high_water: HIGH_WATER }
    }
}

struct SendState {
    file_id: String,
    offset: u64,
    base_chunk_size: u32,
    current_chunk_size: u32,
    batch_size: u32,
    yield_interval_ms: u64,
    backpressure_events: u64,
    start_time: Instant,
}

pub struct SendOutcome {
    pub file_id: String,
    pub bytes_sent: u64,
    pub backpressure_events: u64,
}

/// Runs the send pipeline to completion or a terminal [`TransferError`].
///
/// `file_id` should be 16 random bytes rendered as lowercase hex, generated
/// by the caller (the session orchestrator, which already owns a secure RNG
/// for [`filedrop_types::RoomId::generate`]).
pub async fn run_send<C, F, L>(
    channel: &C,
    file: &F,
    file_id: String,
    name: String,
    file_type: String,
    last_modified: i64,
    config: &SendConfig,
    logger: &L,
    presenter: &dyn Presenter,
    now: impl Fn() -> Instant,
) -> Result<SendOutcome, TransferError>
where
    C: DataChannel + ?Sized,
    F: FileBlob + ?Sized,
    L: TransferLogger + ?Sized,
{
    let outcome =
        run_send_pipeline(channel, file, file_id, name, file_type, last_modified, config, logger, presenter, &now)
            .await;
    if let Err(err) = &outcome {
        presenter.error(err);
    }
    outcome
}

#[allow(clippy::too_many_arguments)]
async fn run_send_pipeline<C, F, L>(
    channel: &C,
    file: &F,
    file_id: String,
    name: String,
    file_type: String,
    last_modified: i64,
    config: &SendConfig,
    logger: &L,
    presenter: &dyn Presenter,
    now: &impl Fn() -> Instant,
) -> Result<SendOutcome, TransferError>
where
    C: DataChannel + ?Sized,
    F: FileBlob + ?Sized,
    L: TransferLogger + ?Sized,
{
    wait_for_open(channel, now).await?;

    let size = file.len();
    let mut state = SendState {
        file_id: file_id.clone(),
        offset: 0,
        base_chunk_size: config.default_chunk_size,
        current_chunk_size: config.default_chunk_size,
        batch_size: 1,
        yield_interval_ms: 50,
        backpressure_events: 0,
        start_time: now(),
    };

    channel.set_low_water(crate::controller::DEFAULT_LOW_WATER);

    let meta = FileMetadata::new(file_id.clone(), name, size, file_type, last_modified, state.base_chunk_size);
    let meta_json =
        serde_json::to_string(&meta).map_err(|e| TransferError::Transport(format!("metadata encode: {e}")))?;
    channel.send_text(meta_json).await.map_err(|_| TransferError::Transport("metadata send failed".into()))?;

    let mut progress = ProgressState::new(state.start_time);
    let target = target_buffer(config.high_water);
    let mut chunks_sent_this_batch: u32 = 0;

    while state.offset < size {
        if channel.buffered_amount() > config.high_water {
            state.backpressure_events += 1;
            logger.log(&state.file_id, TransferEvent::Paused { buffered_amount: channel.buffered_amount() });
            channel.low_water().await;
            logger.log(&state.file_id, TransferEvent::Resumed);
            continue;
        }

        let end = std::cmp::min(state.offset + state.current_chunk_size as u64, size);
        let payload = file
            .slice(state.offset, end)
            .await
            .map_err(|_| TransferError::Io("read error".into()))?;

        if !channel.is_open() {
            return Err(TransferError::Transport("channel closed mid-transfer".into()));
        }

        let crc = crc32(&payload);
        let frame = filedrop_types::ChunkFrame::encode(crc, &payload);
        channel
            .send_binary(frame)
            .await
            .map_err(|_| TransferError::Transport("send failed".into()))?;

        state.offset += payload.len() as u64;
        if let Some(report) = progress.report(state.offset, size, now()) {
            tracing::debug!(file_id = %state.file_id, "{report}");
            presenter.progress(&report);
        }

        chunks_sent_this_batch += 1;
        if chunks_sent_this_batch >= state.batch_size {
            chunks_sent_this_batch = 0;
            adapt_rate(&mut state, channel.buffered_amount(), target);
            logger.log(
                &state.file_id,
                TransferEvent::RateAdjusted {
                    batch_size: state.batch_size,
                    yield_interval_ms: state.yield_interval_ms as u32,
                },
            );
            tokio::time::sleep(std::time::Duration::from_millis(state.yield_interval_ms)).await;
        }
    }

    let duration_ms = now().saturating_duration_since(state.start_time).as_millis() as u64;
    logger.log(&state.file_id, TransferEvent::Complete { total_bytes: size, duration_ms });

    Ok(SendOutcome { file_id: state.file_id, bytes_sent: state.offset, backpressure_events: state.backpressure_events })
}

fn adapt_rate(state: &mut SendState, buffered_amount: u64, target: u64) {
    if buffered_amount < target / 4 && state.batch_size < MAX_BATCH_SIZE {
        state.batch_size = std::cmp::min(MAX_BATCH_SIZE, state.batch_size + 2);
        state.yield_interval_ms = std::cmp::max(MIN_YIELD_MS, state.yield_interval_ms.saturating_sub(5));
    } else if buffered_amount > target && state.batch_size > 1 {
        state.batch_size = std::cmp::max(1, (state.batch_size as f64 * 0.7).floor() as u32);
        state.yield_interval_ms = std::cmp::min(MAX_YIELD_MS, state.yield_interval_ms + 20);
    }
}

async fn wait_for_open<C: DataChannel + ?Sized>(
    channel: &C,
    now: &impl Fn() -> Instant,
) -> Result<(), TransferError> {
    let deadline = now() + std::time::Duration::from_secs(30);
    while !channel.is_open() {
        if now() >= deadline {
            return Err(TransferError::Transport("channel open timeout".into()));
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    Ok(())
}
