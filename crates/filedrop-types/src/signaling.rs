//! Wire types for the signaling protocol (§6.1).
//!
//! Mirrors the tagged-enum shape of `haven-types::events::{GatewayCommand,GatewayEvent}`:
//! one enum per direction, `#[serde(tag = "type", content = "data")]`, one
//! variant per named event. Field names follow §6.1's table literally
//! (`roomId`/`peerId`, not the Rust-ish `room_id`/`peer_id`) since this is the
//! wire contract a browser peer on the other end would also speak.

use serde::{Deserialize, Serialize};

use crate::room::{PeerHandle, RoomId};

/// Opaque SDP blob. Transported as an arbitrary JSON value — the signaling
/// server never inspects it, only measures its serialized size (§4.5).
pub type Sdp = serde_json::Value;

/// Opaque ICE candidate payload. Same treatment as [`Sdp`].
pub type Candidate = serde_json::Value;

/// The three envelope kinds relayed verbatim between peers, per §3.
/// Used both for [`PayloadGuard`]-style size checks and as the payload
/// carried by [`ClientEvent`]/[`ServerEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SignalEnvelope {
    Offer { sdp: Sdp, room: RoomId },
    Answer { sdp: Sdp, room: RoomId },
    Candidate { candidate: Candidate, room: RoomId },
}

impl SignalEnvelope {
    pub fn room(&self) -> &RoomId {
        match self {
            Self::Offer { room, .. } | Self::Answer { room, .. } | Self::Candidate { room, .. } => room,
        }
    }

    /// `true` for `offer`/`answer`, which are exempt from the per-event rate
    /// limiter (§3 RateState, §4.5).
    pub fn rate_limit_exempt(&self) -> bool {
        matches!(self, Self::Offer { .. } | Self::Answer { .. })
    }
}

/// Events a client sends to the signaling server (§6.1, client → server table).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "create-room")]
    CreateRoom { #[serde(rename = "roomId")] room_id: RoomId },

    #[serde(rename = "join-room")]
    JoinRoom { #[serde(rename = "roomId")] room_id: RoomId },

    #[serde(rename = "request-join")]
    RequestJoin { #[serde(rename = "roomId")] room_id: RoomId },

    #[serde(rename = "peer-accepted")]
    PeerAccepted {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "peerId")]
        peer_id: PeerHandle,
    },

    #[serde(rename = "peer-rejected")]
    PeerRejected {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "peerId")]
        peer_id: PeerHandle,
    },

    #[serde(rename = "offer")]
    Offer { offer: Sdp, #[serde(rename = "roomId")] room_id: RoomId },

    #[serde(rename = "answer")]
    Answer { answer: Sdp, #[serde(rename = "roomId")] room_id: RoomId },

    #[serde(rename = "candidate")]
    Candidate { candidate: Candidate, #[serde(rename = "roomId")] room_id: RoomId },
}

impl ClientEvent {
    /// Lift the relayable variants into a [`SignalEnvelope`] for uniform
    /// size/membership checks. Returns `None` for room-lifecycle events.
    pub fn as_envelope(&self) -> Option<SignalEnvelope> {
        match self.clone() {
            ClientEvent::Offer { offer, room_id } => Some(SignalEnvelope::Offer { sdp: offer, room: room_id }),
            ClientEvent::Answer { answer, room_id } => Some(SignalEnvelope::Answer { sdp: answer, room: room_id }),
            ClientEvent::Candidate { candidate, room_id } => {
                Some(SignalEnvelope::Candidate { candidate, room: room_id })
            }
            _ => None,
        }
    }
}

/// Events the signaling server sends to a client (§6.1, server → client table).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "room-created")]
    RoomCreated { #[serde(rename = "roomId")] room_id: RoomId },

    #[serde(rename = "room-joined")]
    RoomJoined { #[serde(rename = "roomId")] room_id: RoomId },

    #[serde(rename = "room-not-found")]
    RoomNotFound { #[serde(rename = "roomId")] room_id: RoomId },

    #[serde(rename = "join-requested")]
    JoinRequested { #[serde(rename = "roomId")] room_id: RoomId },

    #[serde(rename = "peer-join-request")]
    PeerJoinRequest {
        #[serde(rename = "peerId")]
        peer_id: PeerHandle,
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    #[serde(rename = "peer-joined")]
    PeerJoined {
        #[serde(rename = "peerId")]
        peer_id: PeerHandle,
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    #[serde(rename = "peer-rejected")]
    PeerRejected {
        #[serde(rename = "peerId")]
        peer_id: PeerHandle,
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    #[serde(rename = "offer")]
    Offer { offer: Sdp, #[serde(rename = "roomId")] room_id: RoomId, from: PeerHandle },

    #[serde(rename = "answer")]
    Answer { answer: Sdp, #[serde(rename = "roomId")] room_id: RoomId, from: PeerHandle },

    #[serde(rename = "candidate")]
    Candidate { candidate: Candidate, #[serde(rename = "roomId")] room_id: RoomId, from: PeerHandle },

    #[serde(rename = "app-error")]
    AppError { message: String },
}

impl ServerEvent {
    pub fn relay(envelope: SignalEnvelope, from: PeerHandle) -> Self {
        match envelope {
            SignalEnvelope::Offer { sdp, room } => Self::Offer { offer: sdp, room_id: room, from },
            SignalEnvelope::Answer { sdp, room } => Self::Answer { answer: sdp, room_id: room, from },
            SignalEnvelope::Candidate { candidate, room } => Self::Candidate { candidate, room_id: room, from },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::AppError { message: message.into() }
    }
}
