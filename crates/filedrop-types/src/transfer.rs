//! Data-channel wire types (§3): the one-shot text `FileMetadata` frame and
//! the binary `ChunkFrame` format that follows it.

use serde::{Deserialize, Serialize};

/// First frame on the data channel, sent as UTF-8 JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(rename = "type")]
    pub kind: MetadataKind,
    pub file_id: String,
    pub name: String,
    pub size: u64,
    pub file_type: String,
    pub last_modified: i64,
    pub total_chunks: u32,
    pub chunk_size: u32,
}

/// Tag discriminant for [`FileMetadata`]; the only value is `"metadata"`,
/// kept as an enum (rather than a bare string field) so a frame of any other
/// shape fails to deserialize instead of silently matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataKind {
    #[serde(rename = "metadata")]
    Metadata,
}

impl FileMetadata {
    pub fn new(file_id: String, name: String, size: u64, file_type: String, last_modified: i64, chunk_size: u32) -> Self {
        let total_chunks = div_ceil_u64(size, chunk_size as u64) as u32;
        Self { kind: MetadataKind::Metadata, file_id, name, size, file_type, last_modified, total_chunks, chunk_size }
    }
}

fn div_ceil_u64(a: u64, b: u64) -> u64 {
    if a == 0 { 0 } else { (a - 1) / b + 1 }
}

/// Minimum legal length of an encoded [`ChunkFrame`]: 4 bytes of CRC32 plus
/// at least one payload byte (§3 invariant `N ≥ 5`).
pub const MIN_CHUNK_FRAME_LEN: usize = 5;

/// A framed chunk: `[le_u32 crc32][payload]`. [`encode`]/[`decode`] are the
/// only place this layout is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFrame {
    pub crc32: u32,
    pub payload: Vec<u8>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChunkFrameError {
    #[error("frame too short: {0} bytes (minimum {MIN_CHUNK_FRAME_LEN})")]
    TooShort(usize),
}

impl ChunkFrame {
    pub fn encode(crc32: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + payload.len());
        out.extend_from_slice(&crc32.to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ChunkFrameError> {
        if frame.len() < MIN_CHUNK_FRAME_LEN {
            return Err(ChunkFrameError::TooShort(frame.len()));
        }
        let crc32 = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
        Ok(Self { crc32, payload: frame[4..].to_vec() })
    }
}
