//! Capability ports (§9 redesign note 2): the data channel, file reader, and
//! write sink are each a capability trait rather than duck-typed platform
//! objects, matching `haven-fast-transfer::logging::TransferLogger`'s role
//! as a trait object consumed by the pipeline. An embedder supplies a
//! `web-sys`-backed implementation when compiled to `wasm32`; a native
//! in-memory implementation backs the tests in this crate.

use async_trait::async_trait;

use filedrop_types::signaling::{Candidate, Sdp};

use crate::error::TransferError;

/// The WebRTC peer connection, reduced to the negotiation operations §4.7.4
/// drives. An embedder supplies a `web-sys`-backed `RTCPeerConnection`
/// wrapper; `FakePeerConnection` (test-only) backs the controller's own
/// tests the same way `DataChannel` is backed there.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Creates a local SDP offer without yet applying it.
    async fn create_offer(&self) -> Result<Sdp, TransferError>;

    /// Creates a local SDP answer without yet applying it.
    async fn create_answer(&self) -> Result<Sdp, TransferError>;

    async fn set_local_description(&self, sdp: Sdp) -> Result<(), TransferError>;

    async fn set_remote_description(&self, sdp: Sdp) -> Result<(), TransferError>;

    async fn add_ice_candidate(&self, candidate: Candidate) -> Result<(), TransferError>;
}

/// The WebRTC data channel, reduced to the operations C8/C9 need.
#[async_trait]
pub trait DataChannel: Send + Sync {
    async fn send_text(&self, text: String) -> Result<(), TransferError>;
    async fn send_binary(&self, data: Vec<u8>) -> Result<(), TransferError>;

    /// `true` once the channel has finished negotiation and can carry data.
    fn is_open(&self) -> bool;

    /// Bytes handed to the transport that have not yet been transmitted.
    fn buffered_amount(&self) -> u64;

    fn set_low_water(&self, threshold: u64);

    /// Resolves the next time `buffered_amount` drops below the configured
    /// low-water threshold. The sole resumption signal (§4.8.2) — there is
    /// no polling-based alternative.
    async fn low_water(&self);

    async fn close(&self);
}

/// An opaque, randomly-seekable byte source (a browser `File`/`Blob` on the
/// embedder side).
#[async_trait]
pub trait FileBlob: Send + Sync {
    fn len(&self) -> u64;

    /// Reads `[start, end)`. A read failure is an `Io` error, never a panic.
    async fn slice(&self, start: u64, end: u64) -> Result<Vec<u8>, TransferError>;
}

/// A streaming destination for the receive path's large-file fallback.
#[async_trait]
pub trait WritableSink: Send + Sync {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), TransferError>;
    async fn close(&mut self) -> Result<(), TransferError>;
}

/// The UI boundary (§1, §9): status text, progress, error surface, download
/// offer, and approval prompt. Everything the send/receive pipelines and the
/// peer connection controller report crosses exactly this port; no component
/// below it ever reaches further than `Presenter`.
pub trait Presenter: Send + Sync {
    fn status(&self, text: &str);
    fn progress(&self, report: &str);
    fn error(&self, error: &TransferError);
    fn download_ready(&self, name: &str, mime: &str, bytes: Vec<u8>);
    fn approval_prompt(&self, peer_id: String, room_id: String);
}

/// A [`Presenter`] that discards everything, for tests and headless runs.
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn status(&self, _text: &str) {}
    fn progress(&self, _report: &str) {}
    fn error(&self, _error: &TransferError) {}
    fn download_ready(&self, _name: &str, _mime: &str, _bytes: Vec<u8>) {}
    fn approval_prompt(&self, _peer_id: String, _room_id: String) {}
}
